//! Team and channel data collaborators.
//!
//! The picker never talks to a directory service itself. A [`TeamSource`]
//! hands it the raw two-level tree (teams with their channels); the
//! implementations here read one JSON document either from a file or from
//! the stdout of a command.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use std::sync::OnceLock;

use color_eyre::eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};

/// One node of the raw tree: a team (with `children`) or a channel (leaf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub id: String,
    pub display_name: String,
    /// `Some` for teams, even when they have no channels.
    pub children: Option<Vec<SourceNode>>,
}

impl SourceNode {
    pub fn team(
        id: impl Into<String>,
        display_name: impl Into<String>,
        channels: Vec<SourceNode>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            children: Some(channels),
        }
    }

    pub fn channel(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            children: None,
        }
    }

    /// The id/name payload without the children.
    pub fn item(&self) -> SourceItem {
        SourceItem {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Identity and label of a team or channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    pub id: String,
    pub display_name: String,
}

/// Display-only team picture. In a terminal this is a short glyph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct TeamPhoto(pub String);

/// Provider of the team/channel hierarchy.
pub trait TeamSource: Send + Sync {
    /// Whether every scope in `required` has been granted.
    fn has_scopes(&self, required: &[&str]) -> bool;

    /// Non-archived teams, each with its channels as `children`.
    fn fetch_teams_with_channels(&self) -> color_eyre::Result<Vec<SourceNode>>;

    /// Photos keyed by team id. Teams without a photo are absent.
    fn fetch_team_photos(
        &self,
        team_ids: &[String],
    ) -> color_eyre::Result<HashMap<String, TeamPhoto>>;
}

// --- Document format ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Teams(Vec<TeamRecord>),
    Full(FullDocument),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FullDocument {
    #[serde(default)]
    granted_scopes: Option<Vec<String>>,
    teams: Vec<TeamRecord>,
    #[serde(default)]
    photos: HashMap<String, TeamPhoto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamRecord {
    id: String,
    display_name: String,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    channels: Vec<ChannelRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelRecord {
    id: String,
    display_name: String,
}

/// A parsed teams document, usable directly as an in-memory source.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// `None` grants every scope.
    pub granted_scopes: Option<Vec<String>>,
    /// Non-archived teams only.
    pub teams: Vec<SourceNode>,
    pub photos: HashMap<String, TeamPhoto>,
}

impl Directory {
    /// Parse a teams document: either a bare array of teams or an object
    /// with `teams`, `grantedScopes` and `photos`.
    pub fn parse(input: &str) -> color_eyre::Result<Self> {
        let raw: RawDocument =
            serde_json::from_str(input).wrap_err("Failed to parse teams document")?;
        let (granted_scopes, records, photos) = match raw {
            RawDocument::Teams(teams) => (None, teams, HashMap::new()),
            RawDocument::Full(doc) => (doc.granted_scopes, doc.teams, doc.photos),
        };

        let teams = records
            .into_iter()
            .filter(|t| !t.is_archived)
            .map(|t| {
                let channels = t
                    .channels
                    .into_iter()
                    .map(|c| SourceNode::channel(c.id, c.display_name))
                    .collect();
                SourceNode::team(t.id, t.display_name, channels)
            })
            .collect();

        Ok(Self {
            granted_scopes,
            teams,
            photos,
        })
    }
}

impl TeamSource for Directory {
    fn has_scopes(&self, required: &[&str]) -> bool {
        let Some(granted) = &self.granted_scopes else {
            return true;
        };
        required
            .iter()
            .all(|scope| granted.iter().any(|g| g.eq_ignore_ascii_case(scope)))
    }

    fn fetch_teams_with_channels(&self) -> color_eyre::Result<Vec<SourceNode>> {
        Ok(self.teams.clone())
    }

    fn fetch_team_photos(
        &self,
        team_ids: &[String],
    ) -> color_eyre::Result<HashMap<String, TeamPhoto>> {
        Ok(team_ids
            .iter()
            .filter_map(|id| self.photos.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }
}

/// Where a [`DocumentSource`] reads its JSON from.
#[derive(Debug, Clone)]
pub enum Origin {
    File(PathBuf),
    Command(String),
}

/// A source backed by a teams document on disk or produced by a command.
/// The first successful read is reused for every call; a failed read is
/// attempted again on the next call.
pub struct DocumentSource {
    origin: Origin,
    document: OnceLock<Directory>,
}

impl DocumentSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
            document: OnceLock::new(),
        }
    }

    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            origin: Origin::Command(cmd.into()),
            document: OnceLock::new(),
        }
    }

    fn directory(&self) -> color_eyre::Result<&Directory> {
        if let Some(dir) = self.document.get() {
            return Ok(dir);
        }
        let dir = read_origin(&self.origin)?;
        Ok(self.document.get_or_init(|| dir))
    }
}

impl TeamSource for DocumentSource {
    fn has_scopes(&self, required: &[&str]) -> bool {
        match self.directory() {
            Ok(dir) => dir.has_scopes(required),
            Err(err) => {
                tracing::error!("cannot check scopes: {err:#}");
                false
            }
        }
    }

    fn fetch_teams_with_channels(&self) -> color_eyre::Result<Vec<SourceNode>> {
        self.directory()?.fetch_teams_with_channels()
    }

    fn fetch_team_photos(
        &self,
        team_ids: &[String],
    ) -> color_eyre::Result<HashMap<String, TeamPhoto>> {
        self.directory()?.fetch_team_photos(team_ids)
    }
}

fn read_origin(origin: &Origin) -> color_eyre::Result<Directory> {
    let input = match origin {
        Origin::File(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read teams file '{}'", path.display()))?,
        Origin::Command(cmd) => run_teams_command(cmd)?,
    };
    Directory::parse(&input)
}

/// Run a shell command and return its stdout as a string.
fn run_teams_command(cmd: &str) -> color_eyre::Result<String> {
    let output = if cfg!(target_os = "windows") {
        ProcessCommand::new("cmd").args(["/C", cmd]).output()
    } else {
        ProcessCommand::new("sh").args(["-c", cmd]).output()
    }
    .map_err(|e| eyre!("Failed to run teams command '{}': {}", cmd, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(eyre!(
            "Teams command '{}' failed with status {}{}",
            cmd,
            output.status,
            if stderr.is_empty() {
                String::new()
            } else {
                format!(": {}", stderr.trim())
            }
        ));
    }

    String::from_utf8(output.stdout).map_err(|e| {
        eyre!(
            "Teams command '{}' produced invalid UTF-8 output: {}",
            cmd,
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn sample_directory() -> Directory {
        Directory::parse(include_str!("../fixtures/teams.json")).expect("fixture parses")
    }

    #[test]
    fn test_parse_full_document_skips_archived_teams() {
        let dir = sample_directory();
        let names: Vec<&str> = dir.teams.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["Engineering", "Marketing", "Backoffice", "Design"]);
    }

    #[test]
    fn test_team_without_channels_is_still_a_team() {
        let dir = sample_directory();
        let design = dir.teams.iter().find(|t| t.id == "T5").unwrap();
        assert_eq!(design.children, Some(vec![]));
    }

    #[test]
    fn test_channels_become_leaves() {
        let dir = sample_directory();
        let engineering = &dir.teams[0];
        let channels = engineering.children.as_ref().unwrap();
        assert_eq!(
            channels,
            &vec![
                SourceNode::channel("C1", "General"),
                SourceNode::channel("C2", "Backend"),
                SourceNode::channel("C3", "Frontend"),
            ]
        );
        assert!(channels.iter().all(|c| c.children.is_none()));
    }

    #[test]
    fn test_parse_bare_array_grants_all_scopes() {
        let dir = Directory::parse(
            r#"[{"id":"T1","displayName":"Engineering","channels":[{"id":"C1","displayName":"General"}]}]"#,
        )
        .unwrap();
        assert_eq!(dir.teams.len(), 1);
        assert!(dir.granted_scopes.is_none());
        assert!(dir.has_scopes(&["anything"]));
    }

    #[test]
    fn test_has_scopes_is_case_insensitive() {
        let dir = sample_directory();
        assert!(dir.has_scopes(&["team.readbasic.all", "CHANNEL.READBASIC.ALL"]));
        assert!(!dir.has_scopes(&["User.Read.All", "Group.Read.All"]));
        assert!(dir.has_scopes(&[]));
    }

    #[test]
    fn test_photos_filtered_by_requested_ids() {
        let dir = sample_directory();
        let photos = dir
            .fetch_team_photos(&["T1".to_string(), "T3".to_string()])
            .unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos.get("T1"), Some(&TeamPhoto("⚙".to_string())));
    }

    #[test]
    fn test_parse_rejects_malformed_document() {
        let err = Directory::parse("{\"teams\": 3}").unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse teams document"));
    }

    #[test]
    fn test_file_source_reads_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(include_str!("../fixtures/teams.json").as_bytes())
            .unwrap();
        let source = DocumentSource::file(file.path());
        assert!(source.has_scopes(&["Team.ReadBasic.All"]));
        let teams = source.fetch_teams_with_channels().unwrap();
        assert_eq!(teams.len(), 4);
    }

    #[test]
    fn test_missing_file_denies_scopes_and_errors_on_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::file(dir.path().join("missing.json"));
        assert!(!source.has_scopes(&[]));
        let err = source.fetch_teams_with_channels().unwrap_err();
        assert!(err.to_string().contains("Failed to read teams file"));
    }

    #[test]
    fn test_failed_read_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teams.json");
        let source = DocumentSource::file(&path);
        assert!(source.fetch_teams_with_channels().is_err());

        std::fs::write(&path, include_str!("../fixtures/teams.json")).unwrap();
        assert!(source.has_scopes(&["Team.ReadBasic.All"]));
        assert_eq!(source.fetch_teams_with_channels().unwrap().len(), 4);

        // Once read, the document is kept even if the file goes away.
        std::fs::remove_file(&path).unwrap();
        assert_eq!(source.fetch_teams_with_channels().unwrap().len(), 4);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_reads_stdout() {
        let source = DocumentSource::command(
            r#"echo '[{"id":"T9","displayName":"Ops","channels":[]}]'"#,
        );
        let teams = source.fetch_teams_with_channels().unwrap();
        assert_eq!(teams, vec![SourceNode::team("T9", "Ops", vec![])]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_reports_failure() {
        let source = DocumentSource::command("echo nope >&2; exit 3");
        let err = source.fetch_teams_with_channels().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("failed with status"));
        assert!(msg.contains("nope"));
    }
}
