use featurekit_types::ConnectionIdentity;
use std::collections::HashSet;

#[test]
fn identities_equal_by_value() {
    let a = ConnectionIdentity::new("https://host/arcgis/rest/services/x/FeatureServer", None, None);
    let b = ConnectionIdentity::new("https://host/arcgis/rest/services/x/FeatureServer/", None, None);
    assert_eq!(a, b);
}

#[test]
fn credential_distinguishes_identities() {
    let a = ConnectionIdentity::new("https://host/fs", Some("alice@portal".to_string()), None);
    let b = ConnectionIdentity::new("https://host/fs", Some("bob@portal".to_string()), None);
    assert_ne!(a, b);
}

#[test]
fn gdb_version_distinguishes_identities() {
    let a = ConnectionIdentity::new("https://host/fs", None, Some("SDE.DEFAULT".to_string()));
    let b = ConnectionIdentity::new("https://host/fs", None, Some("SDE.EDITS".to_string()));
    assert_ne!(a, b);
}

#[test]
fn identity_is_hashable() {
    let mut set = HashSet::new();
    set.insert(ConnectionIdentity::new("https://host/fs", None, None));
    set.insert(ConnectionIdentity::new("https://host/fs/", None, None));
    assert_eq!(set.len(), 1);
}

#[test]
fn debug_redacts_credential() {
    let id = ConnectionIdentity::new("https://host/fs", Some("secret-token".to_string()), None);
    let debug = format!("{id:?}");
    assert!(!debug.contains("secret-token"));
    assert!(debug.contains("redacted"));
}

#[test]
fn display_includes_version() {
    let id = ConnectionIdentity::new("https://host/fs", None, Some("SDE.DEFAULT".to_string()));
    assert_eq!(id.to_string(), "https://host/fs (SDE.DEFAULT)");
}
