use std::{
    fmt::Display,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use log::{debug, error};
use regex_lite::Regex;
use toml::{Table, Value};

use crate::model::ParseError;

pub const DEFAULT_PROJECT: &str = "droneapi";
pub const DEFAULT_ROOT: &str = "./dependencies";

const PROJECT_KEY: &str = "project";
const ROOT_KEY: &str = "path";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap())
}

/// Name of a dependency, which is also its directory under the dependency root.
#[derive(Clone, Hash, Debug, PartialEq, Eq, Ord, PartialOrd)]
pub struct DependencyName(String);

impl DependencyName {
    pub fn new(s: impl Into<String>) -> Result<Self, ParseError> {
        let s = s.into();
        if s == "." || s == ".." || !name_pattern().is_match(&s) {
            return Err(ParseError::InvalidName(s));
        }
        Ok(DependencyName(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DependencyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for DependencyName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: DependencyName,
    pub url: String,
    /// Branch checked out right after the first clone.
    pub branch: Option<String>,
}

impl DependencySpec {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        branch: Option<&str>,
    ) -> Result<Self, ParseError> {
        Ok(DependencySpec {
            name: DependencyName::new(name)?,
            url: url.into(),
            branch: branch.filter(|b| !b.is_empty()).map(str::to_owned),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySet {
    pub project: String,
    pub root: PathBuf,
    pub dependencies: Vec<DependencySpec>,
}

impl DependencySet {
    /// The built-in dependency table used when no dependency file is present.
    pub fn embedded() -> DependencySet {
        let entry = |name: &str, url: &str, branch: Option<&str>| DependencySpec {
            name: DependencyName(name.to_owned()),
            url: url.to_owned(),
            branch: branch.map(str::to_owned),
        };
        DependencySet {
            project: DEFAULT_PROJECT.to_owned(),
            root: PathBuf::from(DEFAULT_ROOT),
            dependencies: vec![
                entry(
                    "sbt-scalabuff",
                    "git@github.com:geeksville/sbt-scalabuff.git",
                    None,
                ),
                entry(
                    "json4s",
                    "git@github.com:geeksville/json4s.git",
                    Some("fixes_for_dronehub"),
                ),
                entry(
                    "scalatra",
                    "git@github.com:geeksville/scalatra.git",
                    Some("2.3.x_2.10"),
                ),
            ],
        }
    }

    /// Loads `path` if it exists, otherwise falls back to [`DependencySet::embedded`].
    pub fn from_file_or_embedded(path: &Path) -> Result<DependencySet, ParseError> {
        if path.exists() {
            DependencySet::from_file(path)
        } else {
            debug!(
                "No dependency file at {}, using the embedded table",
                path.display()
            );
            Ok(DependencySet::embedded())
        }
    }

    pub fn from_file(path: &Path) -> Result<DependencySet, ParseError> {
        debug!("Attempting to read dependencies from {}", path.display());
        let contents = std::fs::read_to_string(path)?;

        let set = DependencySet::from_toml_str(&contents);
        if let Err(err) = &set {
            error!(
                "Could not build a valid dependency set from {} due to err {err}",
                path.display()
            )
        }
        set
    }

    pub fn from_toml_str(data: &str) -> Result<DependencySet, ParseError> {
        let table = toml::from_str::<Table>(data)?;

        let project = table
            .get(PROJECT_KEY)
            .map(|v| v.clone().try_into::<String>())
            .map_or(Ok(None), |v| v.map(Some))?
            .unwrap_or_else(|| DEFAULT_PROJECT.to_owned());

        let root = table
            .get(ROOT_KEY)
            .map(|v| v.clone().try_into::<PathBuf>())
            .map_or(Ok(None), |v| v.map(Some))?
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT));

        let dependencies = table
            .into_iter()
            .filter(|(k, _)| k != PROJECT_KEY && k != ROOT_KEY)
            .map(|(k, v)| parse_dependency(k, v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DependencySet {
            project,
            root,
            dependencies,
        })
    }

    /// Directory the dependency is cloned into.
    pub fn local_path(&self, dependency: &DependencySpec) -> PathBuf {
        self.root.join(&dependency.name)
    }
}

fn parse_dependency(name: String, value: Value) -> Result<DependencySpec, ParseError> {
    let Value::Table(mut value) = value else {
        return Err(ParseError::NotATable(name));
    };

    let url = value
        .remove("url")
        .ok_or_else(|| ParseError::MissingKey("url".to_string()))
        .and_then(|v| v.try_into::<String>().map_err(|e| e.into()))?;

    let branch = value
        .remove("branch")
        .map(|v| v.try_into::<String>())
        .map_or(Ok(None), |v| v.map(Some))?;

    DependencySpec::new(name, url, branch.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_file_keeps_order() {
        let str = r#"
            project = "droneapi"
            path = "./deps"
            [scalatra]
                url = "git@github.com:geeksville/scalatra.git"
                branch = "2.3.x_2.10"
            [json4s]
                url = "git@github.com:geeksville/json4s.git"
        "#;
        let expected = DependencySet {
            project: "droneapi".to_owned(),
            root: PathBuf::from("./deps"),
            dependencies: vec![
                DependencySpec::new(
                    "scalatra",
                    "git@github.com:geeksville/scalatra.git",
                    Some("2.3.x_2.10"),
                )
                .unwrap(),
                DependencySpec::new("json4s", "git@github.com:geeksville/json4s.git", None)
                    .unwrap(),
            ],
        };
        assert_eq!(DependencySet::from_toml_str(str).unwrap(), expected);
    }

    #[test]
    fn load_file_defaults() {
        let str = r#"
            [libA]
                url = "url-A"
                branch = ""
        "#;
        let set = DependencySet::from_toml_str(str).unwrap();
        assert_eq!(set.project, DEFAULT_PROJECT);
        assert_eq!(set.root, PathBuf::from(DEFAULT_ROOT));
        assert_eq!(set.dependencies[0].branch, None);
        assert_eq!(
            set.local_path(&set.dependencies[0]),
            PathBuf::from("./dependencies/libA")
        );
    }

    #[test]
    fn load_file_no_deps() {
        let set = DependencySet::from_toml_str(r#"path = "/tmp/x""#).unwrap();
        assert!(set.dependencies.is_empty());
    }

    #[test]
    fn load_missing_url() {
        let str = r#"
            [libA]
                branch = "main"
        "#;
        let err = DependencySet::from_toml_str(str).unwrap_err();
        assert!(matches!(err, ParseError::MissingKey(key) if key == "url"));
    }

    #[test]
    fn load_invalid_name() {
        let str = r#"
            [".."]
                url = "url-A"
        "#;
        let err = DependencySet::from_toml_str(str).unwrap_err();
        assert!(matches!(err, ParseError::InvalidName(_)));
    }

    #[test]
    fn load_scalar_dependency() {
        let err = DependencySet::from_toml_str(r#"libA = "url-A""#).unwrap_err();
        assert!(matches!(err, ParseError::NotATable(name) if name == "libA"));
    }

    #[test]
    fn dependency_names() {
        assert!(DependencyName::new("sbt-scalabuff").is_ok());
        assert!(DependencyName::new("json4s_2.10").is_ok());
        assert!(DependencyName::new("a/b").is_err());
        assert!(DependencyName::new(".").is_err());
        assert!(DependencyName::new("").is_err());
    }

    #[test]
    fn embedded_table() {
        let set = DependencySet::embedded();
        assert_eq!(set.root, PathBuf::from("./dependencies"));
        let names: Vec<_> = set.dependencies.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["sbt-scalabuff", "json4s", "scalatra"]);
        assert_eq!(set.dependencies[0].branch, None);
        assert_eq!(
            set.dependencies[1].branch.as_deref(),
            Some("fixes_for_dronehub")
        );
    }

    #[test]
    fn missing_file_falls_back_to_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let set = DependencySet::from_file_or_embedded(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(set, DependencySet::embedded());
    }
}
