//! Use-case orchestration on top of the ports. Each service owns `Arc`s to the
//! ports it needs so handlers can clone them freely.

pub mod accounts;
pub mod journals;
pub mod reminders;
pub mod templates;

pub use accounts::{AccountService, Dashboard, SignUp};
pub use journals::{Created, CustomJournal, EntryUpdate, EntryView, JournalCreation, JournalPage, JournalService, Upload};
pub use reminders::{ReminderJob, ReminderReport};
pub use templates::{SeedReport, TemplateCatalog};
