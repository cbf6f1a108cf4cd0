mod common;

use common::{Incident, Inspection};
use featurekit_model::{
    Feature, FieldValue, Geometry, HasGeometry, ModelError, UNBOUND_OBJECT_ID, ValueKind,
};
use featurekit_types::Point;
use pretty_assertions::assert_eq;
use serde_json::json;

// ── New records ──────────────────────────────────────────────────

#[test]
fn new_record_is_unbound_and_clean() {
    let incident = Incident::new();
    assert_eq!(incident.object_id(), UNBOUND_OBJECT_ID);
    assert!(!incident.is_dirty());
    assert!(incident.changed_fields().is_empty());
    assert!(!incident.state().is_bound());
}

#[test]
fn geometry_capability_is_declared_per_type() {
    assert!(Incident::HAS_GEOMETRY);
    assert!(!Inspection::HAS_GEOMETRY);
}

#[test]
fn mapping_table_is_static_per_type() {
    let first = Incident::mappings();
    let second = Incident::mappings();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.len(), 5);
    assert_eq!(Incident::mapping("STATUS").unwrap().domain, Some("Status"));
    assert_eq!(Incident::mapping("PRIORITY").unwrap().kind, ValueKind::SmallInteger);
    assert!(Incident::mapping("NOTES").is_none());
}

// ── Typed setters ────────────────────────────────────────────────

#[test]
fn setting_a_new_value_marks_dirty_once() {
    let mut incident = Incident::new();
    incident.set_name("Pothole".to_string());
    incident.set_name("Sinkhole".to_string());
    assert!(incident.is_dirty());
    assert_eq!(incident.changed_fields(), ["NAME"]);
    assert_eq!(incident.name(), "Sinkhole");
}

#[test]
fn setting_the_current_value_is_a_no_op() {
    let mut incident = Incident::new();
    incident.set_priority(None);
    incident.set_name(String::new());
    assert!(!incident.is_dirty());
    assert!(incident.changed_fields().is_empty());
}

#[test]
fn each_distinct_field_is_recorded_in_touch_order() {
    let mut incident = Incident::new();
    incident.set_priority(Some(3));
    incident.set_status(Some("Open".to_string()));
    incident.set_priority(Some(4));
    assert_eq!(incident.changed_fields(), ["PRIORITY", "STATUS"]);
}

#[test]
fn mark_clean_clears_everything_at_once() {
    let mut incident = Incident::new();
    incident.set_priority(Some(1));
    incident.set_geometry(Some(Geometry::Point(Point::new(1.0, 2.0))));
    incident.state_mut().mark_clean();
    assert!(!incident.is_dirty());
    assert!(incident.changed_fields().is_empty());
    assert!(!incident.state().geometry_changed());
}

// ── Geometry ─────────────────────────────────────────────────────

#[test]
fn geometry_assignment_always_marks_dirty() {
    let mut incident = Incident::new();
    let point = Geometry::Point(Point::new(1.0, 2.0));
    incident.set_geometry(Some(point.clone()));
    incident.state_mut().mark_clean();

    incident.set_geometry(Some(point.clone()));
    assert!(incident.is_dirty());
    assert!(incident.state().geometry_changed());
    assert!(incident.changed_fields().is_empty());
    assert_eq!(incident.geometry(), Some(&point));
}

// ── Field-by-name access ─────────────────────────────────────────

#[test]
fn field_value_reads_mapped_fields() {
    let mut incident = Incident::new();
    incident.set_priority(Some(2));
    assert_eq!(incident.field_value("PRIORITY"), Some(FieldValue::SmallInteger(2)));
    assert_eq!(incident.field_value("STATUS"), Some(FieldValue::Null));
    assert_eq!(incident.field_value("MISSING"), None);
}

#[test]
fn set_field_value_routes_through_tracker() {
    let mut incident = Incident::new();
    incident.set_field_value("PRIORITY", FieldValue::Integer(5)).unwrap();
    assert_eq!(incident.priority(), &Some(5));
    assert_eq!(incident.changed_fields(), ["PRIORITY"]);
}

#[test]
fn set_field_value_with_equal_value_is_a_no_op() {
    let mut incident = Incident::new();
    incident.set_field_value("STATUS", FieldValue::Null).unwrap();
    assert!(!incident.is_dirty());
}

#[test]
fn set_field_value_rejects_uncoercible_values() {
    let mut incident = Incident::new();
    let err = incident
        .set_field_value("PRIORITY", FieldValue::from("high"))
        .unwrap_err();
    assert!(matches!(err, ModelError::Coercion { .. }));
    assert!(!incident.is_dirty());
}

#[test]
fn set_field_value_rejects_unknown_names() {
    let mut inspection = Inspection::new();
    let err = inspection
        .set_field_value("COLOR", FieldValue::from("red"))
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::UnknownField {
            type_name: "Inspection",
            field: "COLOR".to_string()
        }
    );
}

// ── Unmapped fields ──────────────────────────────────────────────

#[test]
fn unmapped_fields_track_real_changes_only() {
    let mut incident = Incident::new();
    incident.state_mut().set_unmapped("NOTES", json!("first"));
    incident.state_mut().mark_clean();

    incident.state_mut().set_unmapped("NOTES", json!("first"));
    assert!(!incident.is_dirty());

    incident.state_mut().set_unmapped("NOTES", json!("second"));
    assert_eq!(incident.changed_fields(), ["NOTES"]);
    assert_eq!(
        incident.field_value("NOTES"),
        Some(FieldValue::String("second".to_string()))
    );
}

#[test]
fn unbind_resets_identity_and_changes() {
    let mut incident = Incident::new();
    incident.state_mut().bind(common::identity(), 0, 42);
    incident.set_priority(Some(1));
    assert!(incident.state().is_bound());

    incident.state_mut().unbind();
    assert_eq!(incident.object_id(), UNBOUND_OBJECT_ID);
    assert!(incident.state().binding().is_none());
    assert!(!incident.is_dirty());
}
