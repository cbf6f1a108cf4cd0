//! Record type generation.

/// Declares a feature record type.
///
/// Each entry maps a wire field (optionally through a coded-value domain) to
/// a private Rust field, a getter and a setter. Setters compare against the
/// current value and report real changes to the record's [`FeatureState`],
/// so writing an unchanged value never dirties the record. The mapping table
/// is a `static`, built once per type.
///
/// Declare `: HasGeometry` after the type name to give the record a geometry
/// slot.
///
/// ```
/// use featurekit_model::{feature_record, Feature};
///
/// feature_record! {
///     /// An inspection record.
///     pub struct Inspection: HasGeometry {
///         "INSPECTOR" => inspector, set_inspector: String,
///         "STATUS" in "Status" => status, set_status: Option<String>,
///         "SCORE" => score, set_score: Option<f64>,
///     }
/// }
///
/// let mut inspection = Inspection::new();
/// inspection.set_score(Some(4.5));
/// assert!(inspection.is_dirty());
/// assert_eq!(inspection.changed_fields(), ["SCORE"]);
/// ```
///
/// [`FeatureState`]: crate::FeatureState
#[macro_export]
macro_rules! feature_record {
    (@has_geometry) => { false };
    (@has_geometry HasGeometry) => { true };

    (@domain) => { ::core::option::Option::None };
    (@domain $domain:literal) => { ::core::option::Option::Some($domain) };

    (@capability $name:ident) => {};
    (@capability $name:ident HasGeometry) => {
        impl $crate::HasGeometry for $name {}
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $cap:ident)? {
            $(
                $(#[$fmeta:meta])*
                $wire:literal $(in $domain:literal)? => $field:ident, $setter:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            state: $crate::FeatureState,
            $(
                $(#[$fmeta])*
                $field: $ty,
            )*
        }

        impl $name {
            /// Creates an unbound, clean record.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            $(
                #[must_use]
                pub fn $field(&self) -> &$ty {
                    &self.$field
                }

                pub fn $setter(&mut self, value: $ty) {
                    if self.$field != value {
                        self.$field = value;
                        self.state.mark_field_changed($wire);
                    }
                }
            )*
        }

        impl $crate::Feature for $name {
            const HAS_GEOMETRY: bool = $crate::feature_record!(@has_geometry $($cap)?);

            fn type_name() -> &'static str {
                stringify!($name)
            }

            fn mappings() -> &'static [$crate::FieldMapping<Self>] {
                static MAPPINGS: &[$crate::FieldMapping<$name>] = &[
                    $(
                        $crate::FieldMapping {
                            name: $wire,
                            domain: $crate::feature_record!(@domain $($domain)?),
                            kind: <$ty as $crate::NativeField>::KIND,
                            get: |record: &$name| -> $crate::FieldValue {
                                $crate::NativeField::to_value(&record.$field)
                            },
                            set: |record: &mut $name,
                                  value: $crate::FieldValue|
                             -> $crate::CoercionResult<()> {
                                record.$field = <$ty as $crate::NativeField>::from_value(value)?;
                                ::core::result::Result::Ok(())
                            },
                        },
                    )*
                ];
                MAPPINGS
            }

            fn mapping_index() -> &'static ::std::collections::HashMap<&'static str, usize> {
                static INDEX: ::std::sync::OnceLock<
                    ::std::collections::HashMap<&'static str, usize>,
                > = ::std::sync::OnceLock::new();
                INDEX.get_or_init(|| {
                    <$name as $crate::Feature>::mappings()
                        .iter()
                        .enumerate()
                        .map(|(i, mapping)| (mapping.name, i))
                        .collect()
                })
            }

            fn state(&self) -> &$crate::FeatureState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut $crate::FeatureState {
                &mut self.state
            }
        }

        $crate::feature_record!(@capability $name $($cap)?);
    };
}
