//! Feature service client for featurekit.
//!
//! Connects typed, change-tracked records to a remote feature service:
//! - [`FeatureService`]: connects (fetching the schema once per
//!   [`ConnectionIdentity`] through the [`SchemaCache`]), downloads records as
//!   lazy, ordered, optionally paged streams, and inserts, updates and deletes
//! - [`FeatureServiceClient`]: the raw protocol calls
//! - [`Token`]: a self-renewing credential backed by a [`TokenGenerator`]
//!
//! ```no_run
//! use featurekit_client::{Connection, FeatureService, Query, feature_record};
//!
//! feature_record! {
//!     pub struct Hydrant: HasGeometry {
//!         "FACILITYID" => facility_id, set_facility_id: String,
//!         "STATUS" in "HydrantStatus" => status, set_status: Option<String>,
//!     }
//! }
//!
//! # async fn run() -> featurekit_client::ClientResult<()> {
//! let service = FeatureService::connect(Connection::new(
//!     "https://example.com/arcgis/rest/services/Water/FeatureServer",
//! ))
//! .await?;
//!
//! let mut hydrants: Vec<Hydrant> = service
//!     .download_all("Hydrants", Query::new().keep_querying(true))
//!     .await?;
//! for hydrant in &mut hydrants {
//!     hydrant.set_status(Some("Out of service".to_string()));
//! }
//! let result = service.update(&mut hydrants).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod editor;
pub mod error;
pub mod protocol;
pub mod query;
pub mod schema_cache;
pub mod service;
pub mod token;

pub use client::{FeatureRequest, FeatureServiceClient};
pub use config::ClientConfig;
pub use connection::Connection;
pub use editor::{EditResult, InsertResult};
pub use error::{ClientResult, Error, ProtocolCause, ProtocolError};
pub use protocol::{EditOperation, EditOutcome, SpatialFilter, SpatialRel};
pub use query::Query;
pub use schema_cache::SchemaCache;
pub use service::{FeatureService, RecordStream};
pub use token::{
    CredentialsTokenGenerator, EXPIRY_MARGIN_SECS, IssuedToken, Token, TokenClient,
    TokenGenerator, TokenState,
};

pub use featurekit_model::{
    Feature, FieldValue, Geometry, HasGeometry, Layer, LayerRef, ModelError, Schema,
    feature_record,
};
pub use featurekit_types::ConnectionIdentity;
