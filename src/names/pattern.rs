//! Pattern algebra over resource names
//!
//! Patterns in score definitions may start with a `$resource.<kind>`
//! back-reference that is resolved against the resource being scored:
//! `$resource.spec/artifacts/lint` applied to a spec becomes
//! `<that spec>/artifacts/lint`. Patterns without a reference are relative
//! to the project root.

use super::{parse_collection, parse_resource, NameError, NameResult, ResourceName};

pub const RESOURCE_KEYWORD: &str = "$resource";

/// The ancestor a `$resource.<kind>` token refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Api,
    Version,
    Spec,
    Artifact,
}

impl ReferenceKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "api" => Some(ReferenceKind::Api),
            "version" => Some(ReferenceKind::Version),
            "spec" => Some(ReferenceKind::Spec),
            "artifact" => Some(ReferenceKind::Artifact),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ReferenceKind::Api => "api",
            ReferenceKind::Version => "version",
            ReferenceKind::Spec => "spec",
            ReferenceKind::Artifact => "artifact",
        }
    }

    /// The literal token, e.g. `$resource.spec`
    pub fn token(&self) -> String {
        format!("{RESOURCE_KEYWORD}.{}", self.keyword())
    }

    /// Coerces `name` to this kind, empty when it has no such ancestor
    pub fn resolve(&self, name: &ResourceName) -> String {
        match self {
            ReferenceKind::Api => name.api(),
            ReferenceKind::Version => name.version(),
            ReferenceKind::Spec => name.spec(),
            ReferenceKind::Artifact => name.artifact(),
        }
    }
}

/// Parses either a collection or an exact name
pub fn parse_resource_pattern(pattern: &str) -> NameResult<ResourceName> {
    parse_collection(pattern)
        .or_else(|_| parse_resource(pattern))
        .map_err(|_| NameError::InvalidPattern(pattern.to_string()))
}

/// Extracts the leading `$resource.<kind>` reference of a pattern
///
/// Returns `Ok(None)` when the pattern does not start with `$resource`.
/// A pattern that starts with `$resource` but is not followed by one of the
/// known kinds and then `/` or the end of the string is an error.
pub fn parse_reference(pattern: &str) -> NameResult<Option<ReferenceKind>> {
    let Some(rest) = pattern.strip_prefix(RESOURCE_KEYWORD) else {
        return Ok(None);
    };
    let invalid = || NameError::InvalidReference(pattern.to_string());
    let rest = rest.strip_prefix('.').ok_or_else(invalid)?;
    let keyword = rest.split_once('/').map_or(rest, |(keyword, _)| keyword);
    ReferenceKind::from_keyword(keyword).map(Some).ok_or_else(invalid)
}

/// Value the pattern's reference resolves to against `referred`
///
/// `Ok(None)` means the pattern has no reference.
pub fn reference_value(pattern: &str, referred: &ResourceName) -> NameResult<Option<String>> {
    let Some(kind) = parse_reference(pattern)? else {
        return Ok(None);
    };
    let value = kind.resolve(referred);
    if value.is_empty() {
        return Err(NameError::InvalidCombination {
            referred: referred.to_string(),
            pattern: pattern.to_string(),
        });
    }
    Ok(Some(value))
}

/// Resolves the pattern against `referred` and parses the result
pub fn substitute_reference_entity(pattern: &str, referred: &ResourceName) -> NameResult<ResourceName> {
    let Some(kind) = parse_reference(pattern)? else {
        return parse_resource_pattern(&format!("{}/{pattern}", referred.project_root()));
    };
    let value = kind.resolve(referred);
    if value.is_empty() {
        return Err(NameError::InvalidCombination {
            referred: referred.to_string(),
            pattern: pattern.to_string(),
        });
    }
    let resolved = pattern.replacen(&kind.token(), &value, 1);
    parse_resource_pattern(&resolved)
}

/// Replaces the pattern's parent with a concrete `parent` name
///
/// `.../apis/-/versions/1.0.0` with parent `.../apis/petstore` becomes
/// `.../apis/petstore/versions/1.0.0`. The result must be an exact name.
pub fn full_resource_name_from_parent(pattern: &str, parent: &str) -> NameResult<ResourceName> {
    let underivable = || NameError::Underivable {
        pattern: pattern.to_string(),
        parent: parent.to_string(),
    };
    let parsed = parse_resource_pattern(pattern).map_err(|_| underivable())?;
    let pattern_parent = parsed.parent().ok_or_else(underivable)?.to_string();
    if !pattern.starts_with(&pattern_parent) {
        return Err(underivable());
    }
    let derived = pattern.replacen(&pattern_parent, parent, 1);
    parse_resource(&derived).map_err(|_| underivable())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::ResourceKind;

    const ROOT: &str = "projects/demo/locations/global";
    const SPEC: &str = "projects/demo/locations/global/apis/petstore/versions/1.0.0/specs/openapi";

    fn name(s: &str) -> ResourceName {
        parse_resource_pattern(s).unwrap()
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("apis/-/versions/-").unwrap(), None);
        assert_eq!(parse_reference("$resource.api").unwrap(), Some(ReferenceKind::Api));
        assert_eq!(
            parse_reference("$resource.version/specs/-").unwrap(),
            Some(ReferenceKind::Version)
        );
        assert_eq!(
            parse_reference("$resource.spec/artifacts/lint").unwrap(),
            Some(ReferenceKind::Spec)
        );
        assert_eq!(parse_reference("$resource.artifact").unwrap(), Some(ReferenceKind::Artifact));

        for bad in ["$resources.api", "$resource.apis", "$resource.aip", "$resource", "$resource.specs/x"] {
            assert!(
                matches!(parse_reference(bad), Err(NameError::InvalidReference(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_reference_value() {
        let spec = name(SPEC);
        assert_eq!(
            reference_value("$resource.api/artifacts/x", &spec).unwrap().as_deref(),
            Some("projects/demo/locations/global/apis/petstore")
        );
        assert_eq!(reference_value("artifacts/x", &spec).unwrap(), None);

        let api = name("projects/demo/locations/global/apis/petstore");
        assert!(matches!(
            reference_value("$resource.spec", &api),
            Err(NameError::InvalidCombination { .. })
        ));
    }

    #[test]
    fn test_substitute_artifact_reference() {
        let pattern = format!("{ROOT}/apis/-/versions/-/specs/-/artifacts/-");
        let got = substitute_reference_entity("$resource.artifact", &name(&pattern)).unwrap();
        assert_eq!(got.to_string(), pattern);
    }

    #[test]
    fn test_substitute_spec_from_artifact() {
        let got = substitute_reference_entity(
            "$resource.spec",
            &name(&format!("{ROOT}/apis/-/versions/-/specs/-/artifacts/-")),
        )
        .unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/apis/-/versions/-/specs/-"));

        let got = substitute_reference_entity(
            "$resource.spec",
            &name(&format!("{ROOT}/apis/-/versions/-/specs/-@-/artifacts/-")),
        )
        .unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/apis/-/versions/-/specs/-@-"));
    }

    #[test]
    fn test_substitute_spec_is_identity_on_specs() {
        for spec in [SPEC.to_string(), format!("{SPEC}@rev")] {
            let referred = name(&spec);
            let got = substitute_reference_entity("$resource.spec", &referred).unwrap();
            assert_eq!(got, referred);
            assert_eq!(got.to_string(), spec);
        }
    }

    #[test]
    fn test_substitute_with_suffix() {
        let got = substitute_reference_entity("$resource.version/artifacts/lintstats", &name(SPEC)).unwrap();
        assert_eq!(
            got.to_string(),
            format!("{ROOT}/apis/petstore/versions/1.0.0/artifacts/lintstats")
        );
        assert_eq!(got.kind(), ResourceKind::Artifact);
    }

    #[test]
    fn test_substitute_without_reference() {
        let got = substitute_reference_entity("apis/-/versions/-", &name(SPEC)).unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/apis/-/versions/-"));

        let unlocated = name("projects/demo");
        let got = substitute_reference_entity("artifacts/summary", &unlocated).unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/artifacts/summary"));
    }

    #[test]
    fn test_substitute_errors() {
        let spec = name(SPEC);
        assert!(matches!(
            substitute_reference_entity("$resource.artifact", &spec),
            Err(NameError::InvalidCombination { .. })
        ));
        assert!(matches!(
            substitute_reference_entity("$resource.aip", &spec),
            Err(NameError::InvalidReference(_))
        ));
        assert!(substitute_reference_entity("apispecs/-", &spec).is_err());
    }

    #[test]
    fn test_full_name_from_parent() {
        let got = full_resource_name_from_parent(
            &format!("{ROOT}/apis/-/versions/1.0.0"),
            &format!("{ROOT}/apis/petstore"),
        )
        .unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/apis/petstore/versions/1.0.0"));

        let got = full_resource_name_from_parent(
            &format!("{ROOT}/apis/-/versions/-/specs/openapi@rev"),
            &format!("{ROOT}/apis/petstore/versions/1.0.0"),
        )
        .unwrap();
        assert_eq!(got.to_string(), format!("{SPEC}@rev"));

        let got = full_resource_name_from_parent(
            &format!("{ROOT}/apis/-/versions/-/specs/-/artifacts/complexity"),
            SPEC,
        )
        .unwrap();
        assert_eq!(got.to_string(), format!("{SPEC}/artifacts/complexity"));

        let got = full_resource_name_from_parent(&format!("{ROOT}/apis/petstore"), ROOT).unwrap();
        assert_eq!(got.to_string(), format!("{ROOT}/apis/petstore"));
    }

    #[test]
    fn test_full_name_from_parent_errors() {
        let parent = format!("{ROOT}/apis/petstore/versions/1.0.0");
        for pattern in [
            format!("{ROOT}/apispecs/-"),
            format!("{ROOT}/apis/-/specs/-"),
            "projects/demo".to_string(),
        ] {
            assert!(
                matches!(
                    full_resource_name_from_parent(&pattern, &parent),
                    Err(NameError::Underivable { .. })
                ),
                "{pattern}"
            );
        }
        // a parent of the wrong kind yields something unparseable
        assert!(full_resource_name_from_parent(
            &format!("{ROOT}/apis/-/versions/-/specs/openapi"),
            &format!("{ROOT}/apis/petstore"),
        )
        .is_err());
    }
}
