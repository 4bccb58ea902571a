pub mod cli;
pub mod run;

mod run_campaign;
mod run_redraft_email;
mod run_send_emails;
mod run_single_lead;
mod seed_mock_leads;
mod show_database_stats;

pub use cli::MenuAction;
