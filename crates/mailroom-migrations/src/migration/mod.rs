pub use sea_orm_migration::prelude::*;

mod m20260225_000001_create_contact_submissions;
mod m20260225_000002_create_email_recipients;
mod m20260225_000003_create_email_queue;
mod m20260225_000004_create_spam_patterns;
mod m20260225_000005_create_blocked_ips;
mod m20260225_000006_create_email_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260225_000001_create_contact_submissions::Migration),
            Box::new(m20260225_000002_create_email_recipients::Migration),
            Box::new(m20260225_000003_create_email_queue::Migration),
            Box::new(m20260225_000004_create_spam_patterns::Migration),
            Box::new(m20260225_000005_create_blocked_ips::Migration),
            Box::new(m20260225_000006_create_email_logs::Migration),
        ]
    }
}
