use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{SyncError, json_kind};
use crate::extract::{ExtractionPolicy, extract_words};
use crate::persist::write_atomically;

/// One organization member: a login handle plus an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub login: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Member {
    /// Validates a raw JSON entry into a member record.
    pub fn from_value(value: &Value) -> Result<Self, SyncError> {
        let Value::Object(fields) = value else {
            return Err(SyncError::UnexpectedShape(format!(
                "member entry is {}, expected an object",
                json_kind(value)
            )));
        };

        let login = match fields.get("login") {
            Some(Value::String(login)) if !login.trim().is_empty() => login.trim().to_string(),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                return Err(SyncError::UnexpectedShape(
                    "member has no 'login' field".to_string(),
                ));
            }
            Some(other) => {
                return Err(SyncError::InvalidInputKind {
                    field: "login",
                    expected: "a string",
                    found: json_kind(other),
                });
            }
        };

        let name = match fields.get("name") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => {
                Some(name.trim().to_string()).filter(|name| !name.is_empty())
            }
            Some(other) => {
                return Err(SyncError::InvalidInputKind {
                    field: "name",
                    expected: "a string",
                    found: json_kind(other),
                });
            }
        };

        Ok(Self { login, name })
    }

    pub fn words(&self, policy: ExtractionPolicy) -> Vec<String> {
        let raw = if policy.reads_display_name() {
            self.name.as_deref().unwrap_or_default()
        } else {
            self.login.as_str()
        };
        extract_words(raw, policy)
    }
}

/// Members read from a snapshot, plus the entries that failed validation.
#[derive(Debug, Default)]
pub struct LoadedMembers {
    pub members: Vec<Member>,
    pub rejected: Vec<(usize, SyncError)>,
}

pub fn load_members(path: &Path) -> Result<LoadedMembers, SyncError> {
    if !path.exists() {
        return Err(SyncError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read_to_string(path).map_err(|source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_str(&raw).map_err(|source| SyncError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })?;

    let members = parse_members(&data)?;
    tracing::debug!(
        "Loaded {} members from {} ({} rejected)",
        members.members.len(),
        path.display(),
        members.rejected.len()
    );
    Ok(members)
}

pub fn parse_members(data: &Value) -> Result<LoadedMembers, SyncError> {
    let Value::Array(entries) = data else {
        return Err(SyncError::UnexpectedShape(format!(
            "members data is {}, expected an array",
            json_kind(data)
        )));
    };

    let mut loaded = LoadedMembers::default();
    for (idx, entry) in entries.iter().enumerate() {
        match Member::from_value(entry) {
            Ok(member) => loaded.members.push(member),
            Err(err) => loaded.rejected.push((idx, err)),
        }
    }
    Ok(loaded)
}

/// Writes members as a JSON array that `load_members` can read back.
pub fn save_snapshot(path: &Path, members: &[Member]) -> Result<(), SyncError> {
    let mut json = serde_json::to_string_pretty(members).map_err(|err| SyncError::Io {
        path: path.to_path_buf(),
        source: err.into(),
    })?;
    json.push('\n');
    write_atomically(path, &json)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn validates_member_entries() {
        let data = json!([
            { "login": "maria-jose", "name": "Maria José" },
            { "login": "octocat" },
            "not-an-object",
            { "name": "No Login" },
            { "login": "" },
            { "login": 17 },
            { "login": "ok", "name": ["bad"] }
        ]);

        let loaded = parse_members(&data).unwrap();

        assert_eq!(
            loaded.members,
            vec![
                Member {
                    login: "maria-jose".into(),
                    name: Some("Maria José".into()),
                },
                Member {
                    login: "octocat".into(),
                    name: None,
                },
            ]
        );
        let rejected: Vec<usize> = loaded.rejected.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(rejected, vec![2, 3, 4, 5, 6]);
        assert!(matches!(loaded.rejected[0].1, SyncError::UnexpectedShape(_)));
        assert!(matches!(loaded.rejected[1].1, SyncError::UnexpectedShape(_)));
        assert!(matches!(
            loaded.rejected[3].1,
            SyncError::InvalidInputKind { field: "login", .. }
        ));
        assert!(matches!(
            loaded.rejected[4].1,
            SyncError::InvalidInputKind { field: "name", .. }
        ));
    }

    #[test]
    fn rejects_non_array_top_level() {
        let err = parse_members(&json!({ "login": "x" })).unwrap_err();
        assert!(matches!(err, SyncError::UnexpectedShape(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_members(&dir.path().join("members.json")).unwrap_err();
        assert!(matches!(err, SyncError::MissingFile { .. }));
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.json");
        fs::write(&path, "[{\"login\": ").unwrap();

        let err = load_members(&path).unwrap_err();
        assert!(matches!(err, SyncError::MalformedJson { .. }));
    }

    #[test]
    fn snapshot_can_be_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("members.json");
        let members = vec![
            Member {
                login: "jane-doe_bot123".into(),
                name: Some("Jane Doe".into()),
            },
            Member {
                login: "octocat".into(),
                name: None,
            },
        ];

        save_snapshot(&path, &members).unwrap();
        let loaded = load_members(&path).unwrap();

        assert_eq!(loaded.members, members);
        assert!(loaded.rejected.is_empty());
    }

    #[test]
    fn words_follow_policy_field() {
        let member = Member {
            login: "jane-doe_bot123".into(),
            name: Some("Jane Q Doe".into()),
        };
        assert_eq!(member.words(ExtractionPolicy::FirstToken), vec!["jane"]);
        assert_eq!(member.words(ExtractionPolicy::DashSplit), vec!["jane", "doe"]);
        assert_eq!(
            member.words(ExtractionPolicy::FullName),
            vec!["Jane", "Q", "Doe"]
        );

        let nameless = Member {
            login: "octocat".into(),
            name: None,
        };
        assert!(nameless.words(ExtractionPolicy::FullName).is_empty());
    }
}
