//! Spec string parsing.
//!
//! Turns user input such as `acme.widgets,>=1.0.0`,
//! `git+https://example.com/acme/acme.widgets.git,v1.2.0`, a path to an
//! artifact, or an artifact URL into a [`RequirementSpec`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use super::error::StowError;
use super::requirement_spec::{FetchMethod, RequirementSpec};
use crate::archive;
use crate::resolver::{normalize_version, VersionConstraint};

/// Keywords accepted in `key=value` spec fields.
const KEYWORDS: &[&str] = &["name", "namespace", "version", "scm", "src", "shelf"];

/// SCM types this crate can fetch.
const SUPPORTED_SCM: &[&str] = &["git"];

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]*$").expect("valid regex"));

static KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]+$").expect("valid regex"));

static ARTIFACT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<namespace>[A-Za-z0-9_]+)-(?P<name>[A-Za-z0-9_]+)-(?P<version>[vV]?\d+\.\d+\.\d+[0-9A-Za-z.+-]*?)\.(?:tar\.gz|tgz)$")
        .expect("valid regex")
});

/// Fields of a comma-separated spec string.
#[derive(Debug, Default)]
struct SpecFields {
    head: Option<String>,
    version: Option<String>,
    keywords: BTreeMap<String, String>,
}

impl SpecFields {
    fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords.get(key).map(String::as_str)
    }
}

fn invalid(spec: &str, reason: impl Into<String>) -> anyhow::Error {
    StowError::InvalidSpec {
        spec: spec.to_string(),
        reason: reason.into(),
    }
    .into()
}

fn split_fields(input: &str) -> Result<SpecFields> {
    let mut fields = SpecFields::default();
    let mut positional = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((key, value)) = part.split_once('=') {
            let key = key.trim();
            if KEYWORD_RE.is_match(key) {
                if !KEYWORDS.contains(&key) {
                    return Err(invalid(input, format!("unsupported keyword `{}`", key)));
                }
                fields
                    .keywords
                    .insert(key.to_string(), value.trim().to_string());
                continue;
            }
        }
        positional.push(part.to_string());
    }

    if positional.len() > 2 {
        return Err(invalid(input, "expected at most a source and a version before keywords"));
    }

    let mut positional = positional.into_iter();
    fields.head = positional.next();
    fields.version = positional.next();

    if let Some(src) = fields.keywords.remove("src") {
        if fields.head.is_some() {
            return Err(invalid(input, "`src=` given together with a positional source"));
        }
        fields.head = Some(src);
    }
    if let Some(version) = fields.keywords.remove("version") {
        if fields.version.is_some() {
            return Err(invalid(input, "version given twice"));
        }
        fields.version = Some(version);
    }

    Ok(fields)
}

/// Whether `text` looks like a version-control location.
fn is_scm_location(text: &str) -> bool {
    if text.contains("://") {
        let scheme = text.split("://").next().unwrap_or_default();
        return scheme.contains('+') || text.trim_end_matches('/').ends_with(".git");
    }
    text.contains('@')
}

/// Choose the fetch method for a spec string from its syntax.
pub fn choose_fetch_method(input: &str) -> Result<FetchMethod> {
    let fields = split_fields(input)?;
    Ok(choose_method_for(&fields))
}

fn choose_method_for(fields: &SpecFields) -> FetchMethod {
    let head = fields.head.as_deref().unwrap_or_default();

    if fields.keywords.contains_key("scm") || is_scm_location(head) {
        FetchMethod::ScmUrl
    } else if !head.is_empty() && Path::new(head).is_file() {
        FetchMethod::LocalFile
    } else if head.contains("://") {
        FetchMethod::RemoteUrl
    } else if fields.keywords.contains_key("shelf") {
        FetchMethod::Shelf
    } else {
        FetchMethod::Registry
    }
}

/// Parse a spec string into a [`RequirementSpec`].
///
/// `namespace_override`, when given, replaces any namespace found in the
/// string or in the artifact itself.
pub fn parse_requirement_spec(input: &str, namespace_override: Option<&str>) -> Result<RequirementSpec> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(input, "empty spec"));
    }

    let fields = split_fields(input)?;
    let method = choose_method_for(&fields);
    tracing::debug!("spec `{}` uses fetch method {}", input, method);

    let spec = match method {
        FetchMethod::ScmUrl => parse_scm(input, &fields)?,
        FetchMethod::LocalFile => parse_local_file(input, &fields)?,
        FetchMethod::RemoteUrl => parse_remote_url(input, &fields)?,
        FetchMethod::Registry | FetchMethod::Shelf => parse_label_spec(input, &fields, method)?,
    };

    let spec = match namespace_override {
        Some(ns) if !ns.trim().is_empty() => spec.with_namespace(ns.trim()),
        _ => spec,
    };

    finish(input, spec)
}

/// Build a requirement from a dependency-map entry (`"namespace.name" -> constraint`).
pub fn requirement_spec_from_dependency(label: &str, constraint: &str) -> Result<RequirementSpec> {
    let (namespace, name) = split_label(label)?
        .ok_or_else(|| invalid(label, "dependencies must be written as `namespace.name`"))?;

    let constraint = parse_constraint(label, constraint)?;
    finish(
        label,
        RequirementSpec::new(namespace, name).with_constraint(constraint),
    )
}

/// Split `namespace.name`. Returns `None` when there is no dot.
pub fn split_label(label: &str) -> Result<Option<(String, String)>> {
    let label = label.trim();
    match label.split_once('.') {
        Some((namespace, name)) => {
            if namespace.is_empty() || name.is_empty() || name.contains('.') {
                return Err(invalid(label, "expected exactly `namespace.name`"));
            }
            Ok(Some((namespace.to_string(), name.to_string())))
        }
        None => Ok(None),
    }
}

fn parse_constraint(spec: &str, text: &str) -> Result<VersionConstraint> {
    VersionConstraint::parse(text).map_err(|e| invalid(spec, e.to_string()))
}

fn finish(input: &str, spec: RequirementSpec) -> Result<RequirementSpec> {
    if spec.namespace().is_empty() {
        return Err(invalid(
            input,
            "expected `namespace.name` or an explicit `namespace=`",
        ));
    }
    for segment in [spec.namespace(), spec.name()] {
        if !SEGMENT_RE.is_match(segment) {
            return Err(invalid(input, format!("`{}` is not a valid namespace or name", segment)));
        }
    }
    Ok(spec)
}

fn parse_label_spec(input: &str, fields: &SpecFields, method: FetchMethod) -> Result<RequirementSpec> {
    let head = fields.head.as_deref().unwrap_or_default();

    let (mut namespace, mut name) = match split_label(head)? {
        Some((ns, name)) => (ns, name),
        None => (String::new(), head.to_string()),
    };

    if let Some(ns) = fields.keyword("namespace") {
        namespace = ns.to_string();
    }
    if let Some(n) = fields.keyword("name") {
        name = n.to_string();
    }

    if name.is_empty() {
        return Err(invalid(input, "no collection name given"));
    }

    let mut spec = RequirementSpec::new(namespace, name).with_fetch_method(method);

    if let Some(version) = &fields.version {
        spec = spec.with_constraint(parse_constraint(input, version)?);
    }
    if let Some(shelf) = fields.keyword("shelf") {
        spec = spec.with_shelf(shelf);
    }
    Ok(spec)
}

/// Split a conventional artifact file name, `namespace-name-version.tar.gz`,
/// into its parts.
pub fn parse_artifact_filename(file_name: &str) -> Option<(String, String, String)> {
    ARTIFACT_NAME_RE.captures(file_name).map(|caps| {
        (
            caps["namespace"].to_string(),
            caps["name"].to_string(),
            caps["version"].to_string(),
        )
    })
}

/// Repository name from an SCM or artifact location: last path segment
/// without `.git`, `.tar.gz` or `.tgz`.
pub fn repo_url_to_repo_name(location: &str) -> String {
    let trimmed = location.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);

    let last = last.split(',').next().unwrap_or(last);
    last.trim_end_matches(".git")
        .trim_end_matches(".tar.gz")
        .trim_end_matches(".tgz")
        .to_string()
}

fn parse_scm(input: &str, fields: &SpecFields) -> Result<RequirementSpec> {
    let head = fields.head.as_deref().unwrap_or_default();

    // `acme.widgets,scm=git+https://...` names the collection in the head.
    let (location, label_from_head) = match fields.keyword("scm") {
        Some(scm) => (scm, Some(head).filter(|h| !h.is_empty() && !is_scm_location(h))),
        None => (head, None),
    };

    let (scm_type, url) = match location.split_once('+') {
        Some((scm_type, url)) if url.contains("://") => (scm_type, url),
        _ => ("git", location),
    };
    if !SUPPORTED_SCM.contains(&scm_type) {
        return Err(invalid(input, format!("unsupported scm type `{}`", scm_type)));
    }

    let repo_name = match label_from_head {
        Some(label) => label.to_string(),
        None => repo_url_to_repo_name(url),
    };

    let (mut namespace, mut name) = match split_label(&repo_name)? {
        Some((ns, name)) => (ns, name),
        None => (String::new(), repo_name),
    };
    if let Some(ns) = fields.keyword("namespace") {
        namespace = ns.to_string();
    }
    if let Some(n) = fields.keyword("name") {
        name = n.to_string();
    }

    let mut spec = RequirementSpec::new(namespace, name)
        .with_fetch_method(FetchMethod::ScmUrl)
        .with_source(url);

    if let Some(version) = &fields.version {
        match VersionConstraint::parse(version) {
            Ok(constraint) => spec = spec.with_constraint(constraint),
            Err(_) => spec = spec.with_scm_ref(version.as_str()),
        }
    }

    Ok(spec)
}

fn parse_local_file(input: &str, fields: &SpecFields) -> Result<RequirementSpec> {
    let head = fields.head.as_deref().unwrap_or_default();
    let path = Path::new(head);

    let manifest = archive::read_collection_manifest(path)
        .map_err(|e| invalid(input, format!("{:#}", e)))?;

    let (mut namespace, mut name, version) = match manifest {
        Some(manifest) => {
            let version = manifest.version().map_err(|e| invalid(input, format!("{:#}", e)))?;
            (
                manifest.collection.namespace,
                manifest.collection.name,
                Some(version.to_string()),
            )
        }
        None => {
            // Legacy packages carry no manifest; fall back to the file name.
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            match parse_artifact_filename(&file_name) {
                Some((namespace, name, version)) => (namespace, name, Some(version)),
                None => (String::new(), repo_url_to_repo_name(&file_name), None),
            }
        }
    };

    if let Some(ns) = fields.keyword("namespace") {
        namespace = ns.to_string();
    }
    if let Some(n) = fields.keyword("name") {
        name = n.to_string();
    }

    let mut spec = RequirementSpec::new(namespace, name)
        .with_fetch_method(FetchMethod::LocalFile)
        .with_source(head);

    // A version written next to the path must agree with the artifact itself.
    let version = match (version, &fields.version) {
        (Some(found), Some(requested)) => {
            let wanted = parse_constraint(input, requested)?;
            let satisfied = normalize_version(&found)
                .map(|v| wanted.matches(&v))
                .unwrap_or(false);
            if !satisfied {
                return Err(invalid(
                    input,
                    format!("artifact is version {} but {} was requested", found, requested),
                ));
            }
            Some(found)
        }
        (found, requested) => found.or_else(|| requested.clone()),
    };

    if let Some(version) = version {
        spec = spec.with_constraint(parse_constraint(input, &format!("=={}", version))?);
    }
    Ok(spec)
}

fn parse_remote_url(input: &str, fields: &SpecFields) -> Result<RequirementSpec> {
    let head = fields.head.as_deref().unwrap_or_default();
    let url = url::Url::parse(head).map_err(|e| invalid(input, format!("bad URL: {}", e)))?;

    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string();

    let (mut namespace, mut name, mut version) = match parse_artifact_filename(&file_name) {
        Some((namespace, name, version)) => (namespace, name, Some(version)),
        None => (String::new(), String::new(), None),
    };

    if let Some(ns) = fields.keyword("namespace") {
        namespace = ns.to_string();
    }
    if let Some(n) = fields.keyword("name") {
        name = n.to_string();
    }
    if let Some(v) = &fields.version {
        version = Some(v.clone());
    }

    if name.is_empty() {
        return Err(invalid(
            input,
            "cannot tell the collection name from the URL; add `name=` and `namespace=`",
        ));
    }

    let mut spec = RequirementSpec::new(namespace, name)
        .with_fetch_method(FetchMethod::RemoteUrl)
        .with_source(head);

    if let Some(version) = version {
        spec = spec.with_constraint(parse_constraint(input, &version)?);
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CollectionFixture;
    use tempfile::TempDir;

    fn kind(err: &anyhow::Error) -> &StowError {
        err.downcast_ref::<StowError>().expect("a StowError")
    }

    // =========================================================================
    // Fetch Method Selection
    // =========================================================================

    #[test]
    fn test_choose_fetch_method() {
        assert_eq!(choose_fetch_method("acme.widgets").unwrap(), FetchMethod::Registry);
        assert_eq!(
            choose_fetch_method("git+https://example.com/acme/widgets").unwrap(),
            FetchMethod::ScmUrl
        );
        assert_eq!(
            choose_fetch_method("https://example.com/acme/widgets.git").unwrap(),
            FetchMethod::ScmUrl
        );
        assert_eq!(
            choose_fetch_method("git@example.com:acme/acme.widgets.git").unwrap(),
            FetchMethod::ScmUrl
        );
        assert_eq!(
            choose_fetch_method("https://example.com/acme-widgets-1.0.0.tar.gz").unwrap(),
            FetchMethod::RemoteUrl
        );
        assert_eq!(
            choose_fetch_method("acme.widgets,shelf=system").unwrap(),
            FetchMethod::Shelf
        );
    }

    #[test]
    fn test_existing_file_is_local() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::new("acme", "widgets", "1.0.0").write_to(tmp.path());

        assert_eq!(
            choose_fetch_method(path.to_str().unwrap()).unwrap(),
            FetchMethod::LocalFile
        );
    }

    // =========================================================================
    // Registry Specs
    // =========================================================================

    #[test]
    fn test_parse_plain_label() {
        let spec = parse_requirement_spec("acme.widgets", None).unwrap();
        assert_eq!(spec.namespace(), "acme");
        assert_eq!(spec.name(), "widgets");
        assert!(spec.version_constraint().is_any());
        assert_eq!(spec.fetch_method(), FetchMethod::Registry);
    }

    #[test]
    fn test_parse_versions() {
        let pinned = parse_requirement_spec("acme.widgets,==1.0.0", None).unwrap();
        assert_eq!(pinned.version_constraint().as_str(), "==1.0.0");

        let bare = parse_requirement_spec("acme.widgets,1.0.0", None).unwrap();
        assert!(bare.version_constraint().matches(&semver::Version::new(1, 0, 0)));
        assert!(!bare.version_constraint().matches(&semver::Version::new(1, 0, 1)));

        let keyword = parse_requirement_spec("acme.widgets,version=>=2.0.0", None).unwrap();
        assert_eq!(keyword.version_constraint().as_str(), ">=2.0.0");

        let ranged = parse_requirement_spec("acme.widgets,>=1.0.0 <2.0.0", None).unwrap();
        assert!(ranged.version_constraint().matches(&semver::Version::new(1, 5, 0)));
        assert!(!ranged.version_constraint().matches(&semver::Version::new(2, 0, 0)));
    }

    #[test]
    fn test_keyword_overrides() {
        let spec = parse_requirement_spec("widgets,namespace=acme", None).unwrap();
        assert_eq!(spec.label(), "acme.widgets");

        let renamed = parse_requirement_spec("acme.widgets,name=gadgets", None).unwrap();
        assert_eq!(renamed.label(), "acme.gadgets");
    }

    #[test]
    fn test_namespace_override_always_wins() {
        let spec = parse_requirement_spec("acme.widgets,namespace=other", Some("mine")).unwrap();
        assert_eq!(spec.namespace(), "mine");

        let bare = parse_requirement_spec("widgets", Some("mine")).unwrap();
        assert_eq!(bare.label(), "mine.widgets");
    }

    #[test]
    fn test_missing_namespace_is_invalid() {
        let err = parse_requirement_spec("widgets", None).unwrap_err();
        assert!(matches!(kind(&err), StowError::InvalidSpec { .. }));
        assert!(kind(&err).is_structural());
    }

    #[test]
    fn test_invalid_specs() {
        for input in [
            "",
            "acme.widgets,frobnicate=yes",
            "acme.widgets,>=banana",
            "acme.widgets.extra",
            "acme.widgets,1.0.0,2.0.0",
            "ac me.widgets",
        ] {
            let err = parse_requirement_spec(input, None).unwrap_err();
            assert!(
                matches!(kind(&err), StowError::InvalidSpec { .. }),
                "`{}` should be an invalid spec",
                input
            );
        }
    }

    #[test]
    fn test_shelf_keyword() {
        let spec = parse_requirement_spec("acme.widgets,shelf=mirror", None).unwrap();
        assert_eq!(spec.fetch_method(), FetchMethod::Shelf);
        assert_eq!(spec.shelf(), Some("mirror"));
    }

    // =========================================================================
    // SCM Specs
    // =========================================================================

    #[test]
    fn test_parse_scm_with_dotted_repo_name() {
        let spec =
            parse_requirement_spec("git+https://example.com/acme/acme.widgets.git,v1.2.0", None)
                .unwrap();
        assert_eq!(spec.fetch_method(), FetchMethod::ScmUrl);
        assert_eq!(spec.label(), "acme.widgets");
        assert_eq!(spec.source(), Some("https://example.com/acme/acme.widgets.git"));
        assert!(spec.version_constraint().matches(&semver::Version::new(1, 2, 0)));
        assert!(spec.scm_ref().is_none());
    }

    #[test]
    fn test_parse_scm_with_branch() {
        let spec = parse_requirement_spec(
            "git+https://example.com/acme/widgets.git,main,namespace=acme",
            None,
        )
        .unwrap();
        assert_eq!(spec.label(), "acme.widgets");
        assert_eq!(spec.scm_ref(), Some("main"));
        assert!(spec.version_constraint().is_any());
    }

    #[test]
    fn test_parse_scm_keyword_with_label() {
        let spec =
            parse_requirement_spec("acme.widgets,scm=git+https://example.com/x/repo.git", None)
                .unwrap();
        assert_eq!(spec.label(), "acme.widgets");
        assert_eq!(spec.source(), Some("https://example.com/x/repo.git"));
    }

    #[test]
    fn test_parse_scm_requires_namespace() {
        let err = parse_requirement_spec("git+https://example.com/acme/widgets.git", None).unwrap_err();
        assert!(kind(&err).is_structural());
    }

    #[test]
    fn test_unsupported_scm() {
        let err =
            parse_requirement_spec("hg+https://example.com/acme/acme.widgets", None).unwrap_err();
        assert!(err.to_string().contains("unsupported scm type"));
    }

    #[test]
    fn test_repo_url_to_repo_name() {
        assert_eq!(repo_url_to_repo_name("https://example.com/a/acme.widgets.git"), "acme.widgets");
        assert_eq!(repo_url_to_repo_name("git@example.com:a/widgets.git"), "widgets");
        assert_eq!(repo_url_to_repo_name("https://example.com/a/widgets/"), "widgets");
        assert_eq!(repo_url_to_repo_name("/tmp/acme-widgets-1.0.0.tar.gz"), "acme-widgets-1.0.0");
    }

    // =========================================================================
    // Artifact Specs
    // =========================================================================

    #[test]
    fn test_parse_local_file_reads_manifest() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::new("acme", "widgets", "1.3.0")
            .dependency("acme.base", ">=2.0.0")
            .write_to(tmp.path());

        let spec = parse_requirement_spec(path.to_str().unwrap(), None).unwrap();
        assert_eq!(spec.fetch_method(), FetchMethod::LocalFile);
        assert_eq!(spec.label(), "acme.widgets");
        assert_eq!(spec.version_constraint().as_str(), "==1.3.0");
        assert_eq!(spec.source(), path.to_str());
    }

    #[test]
    fn test_parse_local_file_rejects_other_version() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::new("acme", "widgets", "1.3.0").write_to(tmp.path());
        let path = path.to_str().unwrap();

        let err = parse_requirement_spec(&format!("{},2.0.0", path), None).unwrap_err();
        assert!(matches!(kind(&err), StowError::InvalidSpec { .. }));
        assert!(err.to_string().contains("artifact is version 1.3.0"));

        let spec = parse_requirement_spec(&format!("{},1.3.0", path), None).unwrap();
        assert_eq!(spec.version_constraint().as_str(), "==1.3.0");

        let spec = parse_requirement_spec(&format!("{},>=1.0.0", path), None).unwrap();
        assert_eq!(spec.version_constraint().as_str(), "==1.3.0");
    }

    #[test]
    fn test_parse_local_role_uses_file_name() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::role("acme", "server", "0.4.0").write_to(tmp.path());

        let spec = parse_requirement_spec(path.to_str().unwrap(), None).unwrap();
        assert_eq!(spec.label(), "acme.server");
        assert_eq!(spec.version_constraint().as_str(), "==0.4.0");
    }

    #[test]
    fn test_parse_remote_url() {
        let spec =
            parse_requirement_spec("https://cdn.example.com/files/acme-widgets-1.0.0.tar.gz", None)
                .unwrap();
        assert_eq!(spec.fetch_method(), FetchMethod::RemoteUrl);
        assert_eq!(spec.label(), "acme.widgets");
        assert!(spec.version_constraint().matches(&semver::Version::new(1, 0, 0)));
    }

    #[test]
    fn test_parse_remote_url_needs_identity() {
        let err = parse_requirement_spec("https://cdn.example.com/download?id=3", None).unwrap_err();
        assert!(kind(&err).is_structural());

        let spec = parse_requirement_spec(
            "https://cdn.example.com/download/latest.tar.gz,namespace=acme,name=widgets",
            None,
        )
        .unwrap();
        assert_eq!(spec.label(), "acme.widgets");
    }

    // =========================================================================
    // Dependency Map Entries
    // =========================================================================

    #[test]
    fn test_requirement_spec_from_dependency() {
        let spec = requirement_spec_from_dependency("acme.base", ">=2.0.0").unwrap();
        assert_eq!(spec.label(), "acme.base");
        assert_eq!(spec.version_constraint().as_str(), ">=2.0.0");
        assert_eq!(spec.fetch_method(), FetchMethod::Registry);

        let compound = requirement_spec_from_dependency("acme.base", ">=1.0.0,<2.0.0").unwrap();
        assert!(compound.version_constraint().matches(&semver::Version::new(1, 4, 0)));

        assert!(requirement_spec_from_dependency("base", "*").is_err());
        assert!(requirement_spec_from_dependency("acme.base", "nonsense!").is_err());
    }
}
