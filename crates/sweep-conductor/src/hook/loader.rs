use crate::hook::schema::{HookDefinition, RawHook};
use std::path::{Path, PathBuf};

/// Where hook definitions come from. Loaded once per run.
pub trait HookSource: Send + Sync {
    /// Never fails: a missing or unusable document means no hooks.
    fn load(&self) -> Vec<HookDefinition>;
}

/// Hooks held in memory.
pub struct StaticHooks(pub Vec<HookDefinition>);

impl HookSource for StaticHooks {
    fn load(&self) -> Vec<HookDefinition> {
        self.0.clone()
    }
}

/// Hooks read from a user-editable JSON document (comments allowed).
///
/// The document is either a top-level array of hooks or an object with a
/// `hooks` array.
pub struct FileHookSource {
    path: PathBuf,
}

impl FileHookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HookSource for FileHookSource {
    fn load(&self) -> Vec<HookDefinition> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no hooks document");
                return vec![];
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read hooks document");
                return vec![];
            }
        };
        parse_hooks(&content)
    }
}

/// Parse a hooks document. Entries that do not describe a valid hook are
/// skipped with a warning; an unparsable document yields no hooks.
pub fn parse_hooks(content: &str) -> Vec<HookDefinition> {
    let cleaned = strip_jsonc(content);
    if cleaned.trim().is_empty() {
        return vec![];
    }
    let value: serde_json::Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "hooks document is not valid JSON; no hooks loaded");
            return vec![];
        }
    };

    let entries = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("hooks") {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => {
                tracing::warn!("\"hooks\" is not an array; no hooks loaded");
                return vec![];
            }
            None => return vec![],
        },
        _ => {
            tracing::warn!("hooks document must be an array or an object; no hooks loaded");
            return vec![];
        }
    };

    let mut hooks = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        let converted = serde_json::from_value::<RawHook>(entry)
            .map_err(|e| e.to_string())
            .and_then(HookDefinition::try_from);
        match converted {
            Ok(hook) => hooks.push(hook),
            Err(e) => tracing::warn!(index = i, error = %e, "skipping invalid hook"),
        }
    }
    hooks
}

/// Remove `//` and `/* */` comments and trailing commas, leaving string
/// literals untouched.
pub fn strip_jsonc(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ('/', Some('*')) => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            (',', _) => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if !matches!(chars.get(j), Some(']') | Some('}')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::schema::{HookCommand, LifecyclePoint};

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileHookSource::new(dir.path().join("hooks.json"));
        assert!(source.load().is_empty());
    }

    #[test]
    fn loads_object_form_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.json");
        std::fs::write(
            &path,
            r#"{
  // run before anything happens
  "hooks": [
    { "name": "stash", "command": "git stash", "runAt": "beforeBatch" },
    { "name": "save", "command": "command:workbench.action.files.saveAll", "runAt": "afterFile" },
    /* only when things go well */
    { "name": "commit", "command": "git commit -am \"batch // wip\"", "runAt": "afterBatch", "condition": "errorCount == 0" },
  ]
}"#,
        )
        .unwrap();

        let hooks = FileHookSource::new(&path).load();
        let names: Vec<&str> = hooks.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["stash", "save", "commit"]);
        assert_eq!(
            hooks[1].command,
            HookCommand::Host {
                name: "workbench.action.files.saveAll".into()
            }
        );
        assert_eq!(
            hooks[2].command,
            HookCommand::Shell {
                text: "git commit -am \"batch // wip\"".into()
            }
        );
        assert_eq!(hooks[2].run_at, LifecyclePoint::AfterBatch);
    }

    #[test]
    fn loads_array_form() {
        let hooks = parse_hooks(r#"[{"name":"a","command":"echo a","runAt":"beforeFile"}]"#);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].condition, "");
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let hooks = parse_hooks(
            r#"[
                {"name":"ok","command":"echo ok","runAt":"afterFile"},
                {"name":"bad-point","command":"echo","runAt":"sometimes"},
                {"command":"echo no name","runAt":"afterFile"},
                {"name":"ok2","command":"echo ok2","runAt":"onError"}
            ]"#,
        );
        let names: Vec<&str> = hooks.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["ok", "ok2"]);
    }

    #[test]
    fn garbage_document_is_empty() {
        assert!(parse_hooks("{ not json").is_empty());
        assert!(parse_hooks("42").is_empty());
        assert!(parse_hooks("").is_empty());
        assert!(parse_hooks("{\"other\": 1}").is_empty());
    }

    #[test]
    fn strip_keeps_strings() {
        let s = strip_jsonc(r#"{"url": "http://x/*y*/", "a": [1, 2,], } // tail"#);
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["url"], "http://x/*y*/");
        assert_eq!(v["a"].as_array().unwrap().len(), 2);
    }
}
