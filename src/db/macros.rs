//! Backend dispatch macro.
//!
//! `DbPool` and `DbConnection` are both one-variant-per-backend enums; this
//! macro expands the repetitive three-armed match over either of them.

/// Generate backend dispatch match arms for a per-backend enum.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, self, {
///     MySql(p) => p.close().await,
///     Postgres(p) => p.close().await,
///     SQLite(p) => p.close().await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($enum:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::pool::$enum::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
