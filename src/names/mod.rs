//! Resource names for the API registry hierarchy
//!
//! Every registry resource lives under a project:
//!
//! ```text
//! projects/<p>/locations/global/apis/<a>/versions/<v>/specs/<s>[@rev]
//! projects/<p>/locations/global/apis/<a>/deployments/<d>[@rev]
//! <any of the above>/artifacts/<id>
//! ```
//!
//! Names are parsed into a [`ResourceName`] tagged union. Each variant knows
//! its parent and can be coerced to the string form of any ancestor
//! (`api()`, `version()`, `spec()`, `artifact()`), which is what the
//! `$resource.*` back-reference substitution relies on.
//!
//! A `-` identifier is a wildcard and is accepted at every level, so the
//! same types describe both concrete names and patterns.

mod pattern;

pub use pattern::{
    full_resource_name_from_parent, parse_reference, parse_resource_pattern, reference_value,
    substitute_reference_entity, ReferenceKind, RESOURCE_KEYWORD,
};

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Location segment that follows the project id
pub const LOCATION: &str = "global";

/// Identifier that matches any resource at its level
pub const WILDCARD: &str = "-";

/// Errors produced while parsing or rewriting resource names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("invalid resource pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid $resource reference in pattern {0:?}: must be '$resource.(api|version|spec|artifact)'")]
    InvalidReference(String),

    #[error("invalid combination referred: {referred:?} resourcePattern: {pattern:?}")]
    InvalidCombination { referred: String, pattern: String },

    #[error("invalid pattern: {pattern:?} cannot derive resource name from parent {parent}")]
    Underivable { pattern: String, parent: String },
}

pub type NameResult<T> = Result<T, NameError>;

/// Discriminant of a [`ResourceName`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Project,
    Api,
    Version,
    Deployment,
    Spec,
    Artifact,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Project => write!(f, "project"),
            ResourceKind::Api => write!(f, "api"),
            ResourceKind::Version => write!(f, "version"),
            ResourceKind::Deployment => write!(f, "deployment"),
            ResourceKind::Spec => write!(f, "spec"),
            ResourceKind::Artifact => write!(f, "artifact"),
        }
    }
}

/// `projects/<p>` or `projects/<p>/locations/global`
///
/// An empty `project_id` is the project collection (`projects`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName {
    pub project_id: String,
    /// Whether the name was written with its `locations/global` suffix
    pub located: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiName {
    pub project_id: String,
    pub api_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecName {
    pub project_id: String,
    pub api_id: String,
    pub version_id: String,
    pub spec_id: String,
    pub revision_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentName {
    pub project_id: String,
    pub api_id: String,
    pub deployment_id: String,
    pub revision_id: Option<String>,
}

/// An artifact attached to any non-artifact resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    pub parent: Box<ResourceName>,
    pub artifact_id: String,
}

/// A parsed registry resource name or pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    Project(ProjectName),
    Api(ApiName),
    Version(VersionName),
    Deployment(DeploymentName),
    Spec(SpecName),
    Artifact(ArtifactName),
}

impl ProjectName {
    /// `projects/<p>/locations/global`
    pub fn root(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, LOCATION)
    }
}

impl ApiName {
    fn project(&self) -> ProjectName {
        ProjectName {
            project_id: self.project_id.clone(),
            located: true,
        }
    }
}

impl VersionName {
    fn api(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }
}

impl SpecName {
    fn version(&self) -> VersionName {
        VersionName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
            version_id: self.version_id.clone(),
        }
    }
}

impl DeploymentName {
    fn api(&self) -> ApiName {
        ApiName {
            project_id: self.project_id.clone(),
            api_id: self.api_id.clone(),
        }
    }
}

impl ResourceName {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceName::Project(_) => ResourceKind::Project,
            ResourceName::Api(_) => ResourceKind::Api,
            ResourceName::Version(_) => ResourceKind::Version,
            ResourceName::Deployment(_) => ResourceKind::Deployment,
            ResourceName::Spec(_) => ResourceKind::Spec,
            ResourceName::Artifact(_) => ResourceKind::Artifact,
        }
    }

    /// The resource one level up, `None` for projects
    pub fn parent(&self) -> Option<ResourceName> {
        match self {
            ResourceName::Project(_) => None,
            ResourceName::Api(a) => Some(ResourceName::Project(a.project())),
            ResourceName::Version(v) => Some(ResourceName::Api(v.api())),
            ResourceName::Deployment(d) => Some(ResourceName::Api(d.api())),
            ResourceName::Spec(s) => Some(ResourceName::Version(s.version())),
            ResourceName::Artifact(a) => Some((*a.parent).clone()),
        }
    }

    pub fn project_id(&self) -> &str {
        match self {
            ResourceName::Project(p) => &p.project_id,
            ResourceName::Api(a) => &a.project_id,
            ResourceName::Version(v) => &v.project_id,
            ResourceName::Deployment(d) => &d.project_id,
            ResourceName::Spec(s) => &s.project_id,
            ResourceName::Artifact(a) => a.parent.project_id(),
        }
    }

    /// `projects/<p>`
    pub fn project(&self) -> String {
        format!("projects/{}", self.project_id())
    }

    /// `projects/<p>/locations/global`, the prefix shared by everything in the project
    pub fn project_root(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id(), LOCATION)
    }

    /// True for names that end in a collection keyword (`.../specs`)
    pub fn is_collection(&self) -> bool {
        let id = match self {
            ResourceName::Project(p) => &p.project_id,
            ResourceName::Api(a) => &a.api_id,
            ResourceName::Version(v) => &v.version_id,
            ResourceName::Deployment(d) => &d.deployment_id,
            ResourceName::Spec(s) => &s.spec_id,
            ResourceName::Artifact(a) => &a.artifact_id,
        };
        id.is_empty()
    }

    pub fn api_id(&self) -> Option<&str> {
        match self {
            ResourceName::Project(_) => None,
            ResourceName::Api(a) => Some(&a.api_id),
            ResourceName::Version(v) => Some(&v.api_id),
            ResourceName::Deployment(d) => Some(&d.api_id),
            ResourceName::Spec(s) => Some(&s.api_id),
            ResourceName::Artifact(a) => a.parent.api_id(),
        }
    }

    pub fn version_id(&self) -> Option<&str> {
        match self {
            ResourceName::Version(v) => Some(&v.version_id),
            ResourceName::Spec(s) => Some(&s.version_id),
            ResourceName::Artifact(a) => a.parent.version_id(),
            _ => None,
        }
    }

    pub fn spec_id(&self) -> Option<&str> {
        match self {
            ResourceName::Spec(s) => Some(&s.spec_id),
            ResourceName::Artifact(a) => a.parent.spec_id(),
            _ => None,
        }
    }

    /// String form of the API this name belongs to, empty when there is none
    pub fn api(&self) -> String {
        match self {
            ResourceName::Project(_) => String::new(),
            ResourceName::Api(a) if a.api_id.is_empty() => String::new(),
            ResourceName::Api(a) => a.to_string(),
            ResourceName::Version(v) => v.api().to_string(),
            ResourceName::Deployment(d) => d.api().to_string(),
            ResourceName::Spec(s) => s.version().api().to_string(),
            ResourceName::Artifact(a) => a.parent.api(),
        }
    }

    /// String form of the version this name belongs to, empty when there is none
    pub fn version(&self) -> String {
        match self {
            ResourceName::Version(v) if v.version_id.is_empty() => String::new(),
            ResourceName::Version(v) => v.to_string(),
            ResourceName::Spec(s) => s.version().to_string(),
            ResourceName::Artifact(a) => a.parent.version(),
            _ => String::new(),
        }
    }

    /// String form of the spec (including any revision), empty when there is none
    pub fn spec(&self) -> String {
        match self {
            ResourceName::Spec(s) if s.spec_id.is_empty() => String::new(),
            ResourceName::Spec(s) => s.to_string(),
            ResourceName::Artifact(a) => a.parent.spec(),
            _ => String::new(),
        }
    }

    /// String form of the artifact, empty unless this is an artifact name
    pub fn artifact(&self) -> String {
        match self {
            ResourceName::Artifact(a) if !a.artifact_id.is_empty() => a.to_string(),
            _ => String::new(),
        }
    }

    /// Appends an artifact id to this resource
    pub fn artifact_named(&self, artifact_id: &str) -> ResourceName {
        ResourceName::Artifact(ArtifactName {
            parent: Box::new(self.clone()),
            artifact_id: artifact_id.to_string(),
        })
    }
}

fn write_segment(f: &mut fmt::Formatter<'_>, keyword: &str, id: &str) -> fmt::Result {
    if id.is_empty() {
        write!(f, "/{keyword}")
    } else {
        write!(f, "/{keyword}/{id}")
    }
}

fn write_revision(f: &mut fmt::Formatter<'_>, revision: &Option<String>) -> fmt::Result {
    match revision {
        Some(rev) => write!(f, "@{rev}"),
        None => Ok(()),
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.project_id.is_empty() {
            write!(f, "projects")
        } else if self.located {
            write!(f, "{}", self.root())
        } else {
            write!(f, "projects/{}", self.project_id)
        }
    }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/locations/{}", self.project_id, LOCATION)?;
        write_segment(f, "apis", &self.api_id)
    }
}

impl fmt::Display for VersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api())?;
        write_segment(f, "versions", &self.version_id)
    }
}

impl fmt::Display for SpecName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version())?;
        write_segment(f, "specs", &self.spec_id)?;
        write_revision(f, &self.revision_id)
    }
}

impl fmt::Display for DeploymentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api())?;
        write_segment(f, "deployments", &self.deployment_id)?;
        write_revision(f, &self.revision_id)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent.as_ref() {
            // project artifacts always carry the location
            ResourceName::Project(p) => write!(f, "{}", p.root())?,
            other => write!(f, "{other}")?,
        }
        write_segment(f, "artifacts", &self.artifact_id)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Project(p) => p.fmt(f),
            ResourceName::Api(a) => a.fmt(f),
            ResourceName::Version(v) => v.fmt(f),
            ResourceName::Deployment(d) => d.fmt(f),
            ResourceName::Spec(s) => s.fmt(f),
            ResourceName::Artifact(a) => a.fmt(f),
        }
    }
}

impl FromStr for ResourceName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_resource_pattern(s)
    }
}

/// A concrete resource together with the time it was last updated
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    pub name: ResourceName,
    pub update_time: DateTime<Utc>,
}

impl ResourceInstance {
    pub fn new(name: ResourceName, update_time: DateTime<Utc>) -> Self {
        Self { name, update_time }
    }

    /// Parses `name` as an exact resource name stamped with `update_time`
    pub fn parse(name: &str, update_time: DateTime<Utc>) -> NameResult<Self> {
        Ok(Self::new(parse_resource(name)?, update_time))
    }
}

impl fmt::Display for ResourceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

/// Whether a trailing collection keyword is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Collection,
    Exact,
}

/// `[a-z0-9-.]+`
fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

/// `[a-z0-9-]+`
fn is_revision_tag(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Splits `id@rev`, validating both halves
fn split_revision(segment: &str) -> Option<(String, Option<String>)> {
    match segment.split_once('@') {
        Some((id, rev)) if is_identifier(id) && is_revision_tag(rev) => {
            Some((id.to_string(), Some(rev.to_string())))
        }
        Some(_) => None,
        None if is_identifier(segment) => Some((segment.to_string(), None)),
        None => None,
    }
}

fn plain_id(segment: &str) -> Option<String> {
    is_identifier(segment).then(|| segment.to_string())
}

/// Child named by `keyword` under `current`, with an empty id for collections
fn descend(current: ResourceName, keyword: &str, id: Option<&str>) -> Option<ResourceName> {
    let plain = |id: Option<&str>| match id {
        Some(id) => plain_id(id),
        None => Some(String::new()),
    };
    let revisioned = |id: Option<&str>| match id {
        Some(id) => split_revision(id),
        None => Some((String::new(), None)),
    };

    match (current, keyword) {
        (ResourceName::Artifact(_), _) => None,
        (parent, "artifacts") => Some(ResourceName::Artifact(ArtifactName {
            parent: Box::new(parent),
            artifact_id: plain(id)?,
        })),
        (ResourceName::Project(p), "apis") => Some(ResourceName::Api(ApiName {
            project_id: p.project_id,
            api_id: plain(id)?,
        })),
        (ResourceName::Api(a), "versions") => Some(ResourceName::Version(VersionName {
            project_id: a.project_id,
            api_id: a.api_id,
            version_id: plain(id)?,
        })),
        (ResourceName::Api(a), "deployments") => {
            let (deployment_id, revision_id) = revisioned(id)?;
            Some(ResourceName::Deployment(DeploymentName {
                project_id: a.project_id,
                api_id: a.api_id,
                deployment_id,
                revision_id,
            }))
        }
        (ResourceName::Version(v), "specs") => {
            let (spec_id, revision_id) = revisioned(id)?;
            Some(ResourceName::Spec(SpecName {
                project_id: v.project_id,
                api_id: v.api_id,
                version_id: v.version_id,
                spec_id,
                revision_id,
            }))
        }
        _ => None,
    }
}

fn parse_name(name: &str, mode: ParseMode) -> Option<ResourceName> {
    let segments: Vec<&str> = name.split('/').collect();
    if segments.first() != Some(&"projects") {
        return None;
    }

    let Some(project_id) = segments.get(1) else {
        return (mode == ParseMode::Collection).then(|| {
            ResourceName::Project(ProjectName {
                project_id: String::new(),
                located: false,
            })
        });
    };
    let project_id = plain_id(project_id)?;

    let rest = &segments[2..];
    if rest.is_empty() {
        return (mode == ParseMode::Exact).then_some(ResourceName::Project(ProjectName {
            project_id,
            located: false,
        }));
    }
    if rest.len() < 2 || rest[0] != "locations" || rest[1] != LOCATION {
        return None;
    }

    let mut current = ResourceName::Project(ProjectName {
        project_id,
        located: true,
    });
    let mut pairs = rest[2..].chunks(2).peekable();
    if pairs.peek().is_none() && mode == ParseMode::Collection {
        return None;
    }
    while let Some(pair) = pairs.next() {
        let id = pair.get(1).copied();
        if id.is_none() && (mode == ParseMode::Exact || pairs.peek().is_some()) {
            return None;
        }
        current = descend(current, pair[0], id)?;
        // a collection keyword can only appear last
        if current.is_collection() && pairs.peek().is_some() {
            return None;
        }
    }

    let collection = current.is_collection();
    match mode {
        ParseMode::Collection if collection => Some(current),
        ParseMode::Exact if !collection => Some(current),
        _ => None,
    }
}

/// Parses a name ending in a collection keyword, e.g. `.../apis/-/versions`
pub fn parse_collection(name: &str) -> NameResult<ResourceName> {
    parse_name(name, ParseMode::Collection).ok_or_else(|| NameError::InvalidPattern(name.to_string()))
}

/// Parses a name ending in an identifier; wildcards are allowed at any level
pub fn parse_resource(name: &str) -> NameResult<ResourceName> {
    parse_name(name, ParseMode::Exact).ok_or_else(|| NameError::InvalidPattern(name.to_string()))
}
