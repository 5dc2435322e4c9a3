//! Record accumulation and dynamic-schema tabular export.
//!
//! A [`Record`] collects one floorplan's data. A [`Schema`] is resolved once
//! per run from the static [`ColumnTable`] and the [`RunConfig`]; the
//! [`SchemaExporter`] then maps each record onto that schema and streams
//! cells into a [`Sink`].
//!
//! [`RunConfig`]: aptsheet_shared::RunConfig

pub mod category;
pub mod cell;
pub mod exporter;
pub mod record;
pub mod schema;
pub mod sink;

pub use category::{OTHER, TagSet, Vocabularies};
pub use cell::{CellFormat, CellValue, cell_address, column_letters};
pub use exporter::{ExportState, SchemaExporter};
pub use record::{LINK_MARKER, Record};
pub use schema::{ColumnKind, ColumnSpec, ColumnTable, Schema};
pub use sink::{DelimitedSink, MemorySink, Sink, WrittenCell};
