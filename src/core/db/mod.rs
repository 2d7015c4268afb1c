/// Database Module
///
/// The database layer is split into three concerns:
/// - **Connection Management** (`connection.rs`): opens export databases and registers
///   the SQL helper functions the export queries rely on
/// - **Result Schema** (`schema.rs`): column descriptors and typed cell values
/// - **Row Sources** (`query.rs`): lazy, batched access to query results
///
/// All database operations report failures through `ExportError`.
pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;
