//! The canonical application document and its records.
//!
//! A [`Snapshot`] is always in normalized form: collections are present,
//! brand and social fields are strings, and optional record text is an empty
//! string rather than absent. Build one from untrusted input with
//! [`normalize`](crate::normalize).

use crate::{error::Result, Error, RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Social links shown on the public page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Social {
    pub instagram: String,
    pub youtube: String,
    pub spotify: String,
    pub email: String,
    pub whatsapp: String,
}

/// Brand identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    pub tagline: String,
    pub social: Social,
}

/// Direction of a financial entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// A financial entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: RecordId,
    pub kind: TransactionKind,
    /// Positive amount in the brand's currency
    pub amount: f64,
    pub category: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub note: String,
    /// Milliseconds since epoch
    pub created_at: Timestamp,
}

impl Transaction {
    /// Create a transaction with a fresh id.
    ///
    /// Rejects non-positive amounts and empty category or date.
    pub fn new(
        kind: TransactionKind,
        amount: f64,
        category: impl Into<String>,
        date: impl Into<String>,
        note: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self> {
        let category = category.into().trim().to_string();
        let date = date.into().trim().to_string();

        if !(amount.is_finite() && amount > 0.0) {
            return Err(Error::InvalidRecord(format!(
                "amount must be positive, got {amount}"
            )));
        }
        if category.is_empty() {
            return Err(Error::InvalidRecord("category is required".into()));
        }
        if date.is_empty() {
            return Err(Error::InvalidRecord("date is required".into()));
        }

        Ok(Self {
            id: generate_id("t", now),
            kind,
            amount,
            category,
            date,
            note: note.into().trim().to_string(),
            created_at: now,
        })
    }
}

/// Booking state of a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    Confirmed,
    Pending,
    Declined,
}

/// A show guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: RecordId,
    pub name: String,
    pub social_handle: String,
    pub bio: String,
    pub contact: String,
    pub status: GuestStatus,
    /// Encoded image payload, empty when there is no photo
    pub photo: String,
    pub created_at: Timestamp,
}

impl Guest {
    /// Create a guest with a fresh id. Name and bio are required.
    pub fn new(
        name: impl Into<String>,
        bio: impl Into<String>,
        status: GuestStatus,
        now: Timestamp,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let bio = bio.into().trim().to_string();

        if name.is_empty() {
            return Err(Error::InvalidRecord("guest name is required".into()));
        }
        if bio.is_empty() {
            return Err(Error::InvalidRecord("guest bio is required".into()));
        }

        Ok(Self {
            id: generate_id("g", now),
            name,
            social_handle: String::new(),
            bio,
            contact: String::new(),
            status,
            photo: String::new(),
            created_at: now,
        })
    }

    pub fn with_social_handle(mut self, handle: impl Into<String>) -> Self {
        self.social_handle = handle.into().trim().to_string();
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into().trim().to_string();
        self
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = photo.into();
        self
    }
}

/// Production state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeStatus {
    Planned,
    Recorded,
    Published,
}

/// A show episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: RecordId,
    pub title: String,
    /// Free text, not a reference into `guests`
    pub guest_name: String,
    pub date: String,
    pub status: EpisodeStatus,
    pub link: String,
    pub note: String,
    pub thumbnail: String,
    pub created_at: Timestamp,
}

impl Episode {
    /// Create an episode with a fresh id. Title and date are required.
    pub fn new(
        title: impl Into<String>,
        date: impl Into<String>,
        status: EpisodeStatus,
        now: Timestamp,
    ) -> Result<Self> {
        let title = title.into().trim().to_string();
        let date = date.into().trim().to_string();

        if title.is_empty() {
            return Err(Error::InvalidRecord("episode title is required".into()));
        }
        if date.is_empty() {
            return Err(Error::InvalidRecord("episode date is required".into()));
        }

        Ok(Self {
            id: generate_id("e", now),
            title,
            guest_name: String::new(),
            date,
            status,
            link: String::new(),
            note: String::new(),
            thumbnail: String::new(),
            created_at: now,
        })
    }

    pub fn with_guest_name(mut self, guest_name: impl Into<String>) -> Self {
        self.guest_name = guest_name.into().trim().to_string();
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into().trim().to_string();
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into().trim().to_string();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }
}

/// Generate a record id: `<prefix>_<millis>_<random hex>`.
///
/// Ids are never reused; the random suffix separates ids minted within the
/// same millisecond.
pub fn generate_id(prefix: &str, now: Timestamp) -> RecordId {
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", prefix, now, &random[..12])
}

/// Income, expense and balance over a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceTotals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl FinanceTotals {
    fn add(&mut self, transaction: &Transaction) {
        match transaction.kind {
            TransactionKind::Income => self.income += transaction.amount,
            TransactionKind::Expense => self.expense += transaction.amount,
        }
        self.balance = self.income - self.expense;
    }
}

/// Totals for one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyFinance {
    pub month: String,
    #[serde(flatten)]
    pub totals: FinanceTotals,
}

/// The whole application document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub brand: Brand,
    /// Newest first by convention
    pub transactions: Vec<Transaction>,
    pub guests: Vec<Guest>,
    pub episodes: Vec<Episode>,
}

impl Snapshot {
    /// Count records across all collections.
    pub fn record_count(&self) -> usize {
        self.transactions.len() + self.guests.len() + self.episodes.len()
    }

    // Transactions

    /// Insert at the head of the collection.
    pub fn add_transaction(&mut self, transaction: Transaction) {
        self.transactions.insert(0, transaction);
    }

    pub fn transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|t| t.id == id)
    }

    /// Remove by id. Returns whether a record was removed.
    pub fn remove_transaction(&mut self, id: &str) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        self.transactions.len() != before
    }

    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    // Guests

    pub fn add_guest(&mut self, guest: Guest) {
        self.guests.insert(0, guest);
    }

    pub fn guest_mut(&mut self, id: &str) -> Option<&mut Guest> {
        self.guests.iter_mut().find(|g| g.id == id)
    }

    pub fn remove_guest(&mut self, id: &str) -> bool {
        let before = self.guests.len();
        self.guests.retain(|g| g.id != id);
        self.guests.len() != before
    }

    pub fn clear_guests(&mut self) {
        self.guests.clear();
    }

    // Episodes

    pub fn add_episode(&mut self, episode: Episode) {
        self.episodes.insert(0, episode);
    }

    pub fn episode_mut(&mut self, id: &str) -> Option<&mut Episode> {
        self.episodes.iter_mut().find(|e| e.id == id)
    }

    pub fn remove_episode(&mut self, id: &str) -> bool {
        let before = self.episodes.len();
        self.episodes.retain(|e| e.id != id);
        self.episodes.len() != before
    }

    pub fn clear_episodes(&mut self) {
        self.episodes.clear();
    }

    /// Episodes visible on the public page, in collection order.
    pub fn published_episodes(&self) -> impl Iterator<Item = &Episode> {
        self.episodes
            .iter()
            .filter(|e| e.status == EpisodeStatus::Published)
    }

    /// Totals across every transaction.
    pub fn finance_totals(&self) -> FinanceTotals {
        let mut totals = FinanceTotals::default();
        for transaction in &self.transactions {
            totals.add(transaction);
        }
        totals
    }

    /// Totals grouped by the requested `YYYY-MM` keys, in the order given.
    ///
    /// Transactions dated outside those months are ignored.
    pub fn finance_by_month(&self, months: &[String]) -> Vec<MonthlyFinance> {
        let mut by_month: BTreeMap<&str, FinanceTotals> = months
            .iter()
            .map(|m| (m.as_str(), FinanceTotals::default()))
            .collect();

        for transaction in &self.transactions {
            let key = month_key(&transaction.date);
            if let Some(totals) = by_month.get_mut(key) {
                totals.add(transaction);
            }
        }

        months
            .iter()
            .map(|m| MonthlyFinance {
                month: m.clone(),
                totals: by_month.get(m.as_str()).copied().unwrap_or_default(),
            })
            .collect()
    }
}

/// `"2026-02-11"` -> `"2026-02"`.
pub fn month_key(date: &str) -> &str {
    date.get(..7).unwrap_or(date)
}

/// The `count` most recent month keys ending at `today`'s month, oldest first.
pub fn last_months(today: chrono::NaiveDate, count: u32) -> Vec<String> {
    use chrono::Datelike;

    let current = today.year() * 12 + today.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income(amount: f64, date: &str) -> Transaction {
        Transaction::new(TransactionKind::Income, amount, "Sponsor", date, "", 1000).unwrap()
    }

    fn expense(amount: f64, date: &str) -> Transaction {
        Transaction::new(TransactionKind::Expense, amount, "Studio", date, "", 1000).unwrap()
    }

    #[test]
    fn ids_carry_prefix_and_time() {
        let id = generate_id("t", 1_768_000_000_000);
        assert!(id.starts_with("t_1768000000000_"));
        assert_eq!(id.len(), "t_1768000000000_".len() + 12);
    }

    #[test]
    fn ids_are_unique_within_a_millisecond() {
        let a = generate_id("g", 42);
        let b = generate_id("g", 42);
        assert_ne!(a, b);
    }

    #[test]
    fn transaction_validation() {
        assert!(Transaction::new(TransactionKind::Income, 0.0, "x", "2026-01-01", "", 1).is_err());
        assert!(
            Transaction::new(TransactionKind::Income, f64::NAN, "x", "2026-01-01", "", 1).is_err()
        );
        assert!(Transaction::new(TransactionKind::Income, 10.0, "  ", "2026-01-01", "", 1).is_err());
        assert!(Transaction::new(TransactionKind::Income, 10.0, "x", "", "", 1).is_err());

        let t = Transaction::new(TransactionKind::Expense, 9.5, " Gear ", "2026-01-01", " mic ", 7)
            .unwrap();
        assert_eq!(t.category, "Gear");
        assert_eq!(t.note, "mic");
        assert_eq!(t.created_at, 7);
    }

    #[test]
    fn guest_and_episode_validation() {
        assert!(Guest::new("", "bio", GuestStatus::Pending, 1).is_err());
        assert!(Guest::new("Ana", "", GuestStatus::Pending, 1).is_err());
        assert!(Episode::new("", "2026-01-01", EpisodeStatus::Planned, 1).is_err());
        assert!(Episode::new("Pilot", "", EpisodeStatus::Planned, 1).is_err());

        let guest = Guest::new("Ana", "Chef", GuestStatus::Confirmed, 1)
            .unwrap()
            .with_social_handle("@ana")
            .with_contact("ana@example.com");
        assert!(guest.id.starts_with("g_"));
        assert_eq!(guest.social_handle, "@ana");
        assert!(guest.photo.is_empty());
    }

    #[test]
    fn add_prepends_and_remove_reports() {
        let mut snapshot = Snapshot::default();
        let first = income(10.0, "2026-01-01");
        let second = income(20.0, "2026-01-02");
        let first_id = first.id.clone();

        snapshot.add_transaction(first);
        snapshot.add_transaction(second.clone());
        assert_eq!(snapshot.transactions[0], second);

        assert!(snapshot.remove_transaction(&first_id));
        assert!(!snapshot.remove_transaction(&first_id));
        assert_eq!(snapshot.transactions.len(), 1);
    }

    #[test]
    fn edit_in_place() {
        let mut snapshot = Snapshot::default();
        let episode = Episode::new("Pilot", "2026-02-01", EpisodeStatus::Planned, 1).unwrap();
        let id = episode.id.clone();
        snapshot.add_episode(episode);

        snapshot.episode_mut(&id).unwrap().status = EpisodeStatus::Published;
        assert_eq!(snapshot.published_episodes().count(), 1);
        assert!(snapshot.episode_mut("missing").is_none());
    }

    #[test]
    fn totals() {
        let mut snapshot = Snapshot::default();
        snapshot.add_transaction(income(100.0, "2026-01-10"));
        snapshot.add_transaction(expense(30.0, "2026-01-11"));
        snapshot.add_transaction(income(5.5, "2026-02-01"));

        let totals = snapshot.finance_totals();
        assert_eq!(totals.income, 105.5);
        assert_eq!(totals.expense, 30.0);
        assert_eq!(totals.balance, 75.5);
    }

    #[test]
    fn monthly_totals_ignore_other_months() {
        let mut snapshot = Snapshot::default();
        snapshot.add_transaction(income(100.0, "2026-01-10"));
        snapshot.add_transaction(expense(40.0, "2026-01-20"));
        snapshot.add_transaction(income(999.0, "2025-06-01"));

        let months = vec!["2025-12".to_string(), "2026-01".to_string()];
        let report = snapshot.finance_by_month(&months);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].month, "2025-12");
        assert_eq!(report[0].totals, FinanceTotals::default());
        assert_eq!(report[1].totals.income, 100.0);
        assert_eq!(report[1].totals.balance, 60.0);
    }

    #[test]
    fn last_months_crosses_year_boundary() {
        let today = chrono::NaiveDate::from_ymd_opt(2026, 2, 11).unwrap();
        assert_eq!(
            last_months(today, 4),
            vec!["2025-11", "2025-12", "2026-01", "2026-02"]
        );
        assert!(last_months(today, 0).is_empty());
    }

    #[test]
    fn month_key_of_short_dates() {
        assert_eq!(month_key("2026-02-11"), "2026-02");
        assert_eq!(month_key("2026"), "2026");
        assert_eq!(month_key(""), "");
    }
}
