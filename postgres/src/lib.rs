//! `PostgreSQL` stores for the event management service.
//!
//! This crate implements the store traits from `eventhub-core` on top of a
//! shared sqlx connection pool:
//!
//! - [`PostgresEventStore`]: the `events` table, including the cached
//!   `attendees_count`
//! - [`PostgresParticipationStore`]: the `event_participants` table, whose
//!   primary key on `(event_id, attendee_id)` rejects duplicate RSVPs
//!
//! Counter changes are single relative `UPDATE` statements, and a recount is
//! one `UPDATE ... SET attendees_count = (SELECT COUNT(*) ...)`, so neither
//! concurrent registrations nor reconciliation lose increments.
//!
//! # Example
//!
//! ```no_run
//! use eventhub_postgres::{PostgresEventStore, PostgresParticipationStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/eventhub").await?;
//! let events = PostgresEventStore::from_pool(pool.clone());
//! events.migrate().await?;
//! let participations = PostgresParticipationStore::from_pool(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod participations;

pub use events::PostgresEventStore;
pub use participations::PostgresParticipationStore;

use eventhub_core::error::StoreError;

fn database_error(context: &str, err: &sqlx::Error) -> StoreError {
    StoreError::DatabaseError(format!("{context}: {err}"))
}

/// Escape `%`, `_` and `\` so user input matches literally inside `LIKE`.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("Rust meetup"), "Rust meetup");
    }
}
