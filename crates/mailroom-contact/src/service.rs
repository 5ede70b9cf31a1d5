//! Contact submission intake pipeline and moderation operations

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveTime};
use mailroom_core::{Clock, DBDateTime, Job, JobQueue, RequestMetadata, SendQueuedEmailJob};
use mailroom_entities::{contact_submissions, Language, SubmissionStatus};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info};

use crate::block::BlockedIpService;
use crate::errors::ContactError;
use crate::notifier::NotificationDispatcher;
use crate::rate_limit::RateLimitService;
use crate::spam::{SpamScorer, SubmissionInput, SPAM_SCORE_THRESHOLD};

const NAME_MIN_LEN: usize = 2;
const NAME_MAX_LEN: usize = 100;
const EMAIL_MAX_LEN: usize = 255;
const PHONE_MAX_LEN: usize = 20;
const SUBJECT_MAX_LEN: usize = 200;
const MESSAGE_MIN_LEN: usize = 10;
const MESSAGE_MAX_LEN: usize = 5000;

/// Public contact form payload
#[derive(Debug, Clone)]
pub struct SubmitContactRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub language: String,
    pub privacy_accepted: bool,
}

/// Filters for the moderation listing
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilters {
    pub status: Option<String>,
    /// Spam rows are excluded unless explicitly requested (or the status
    /// filter asks for them)
    pub include_spam: bool,
    pub search: Option<String>,
    pub date_from: Option<DBDateTime>,
    pub date_to: Option<DBDateTime>,
    pub language: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// Counts for the moderation dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionStatistics {
    pub total: u64,
    pub new: u64,
    pub read: u64,
    pub replied: u64,
    pub archived: u64,
    pub spam: u64,
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
}

/// Effect the intake pipeline must execute alongside persisting the
/// submission. Produced by the pure classification step; executed inside
/// the intake transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntakeEffect {
    /// Spam path: bump the block-list bookkeeping for this IP
    RecordSpamHit,
    /// Legitimate path: fan out to the configured recipients
    Notify,
}

/// Pure classification: score against threshold decides the created
/// status and the branch effect
fn classify(score: i32) -> (SubmissionStatus, IntakeEffect) {
    if score >= SPAM_SCORE_THRESHOLD {
        (SubmissionStatus::Spam, IntakeEffect::RecordSpamHit)
    } else {
        (SubmissionStatus::New, IntakeEffect::Notify)
    }
}

/// Strip HTML tags from user-supplied text
fn strip_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => output.push(c),
            _ => {}
        }
    }
    output
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

/// Contact intake and moderation service
pub struct ContactService {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
    scorer: SpamScorer,
    rate_limiter: RateLimitService,
    blocked_ips: Arc<BlockedIpService>,
    dispatcher: Arc<NotificationDispatcher>,
    queue: Arc<dyn JobQueue>,
}

impl ContactService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: Arc<dyn Clock>,
        scorer: SpamScorer,
        rate_limiter: RateLimitService,
        blocked_ips: Arc<BlockedIpService>,
        dispatcher: Arc<NotificationDispatcher>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            db,
            clock,
            scorer,
            rate_limiter,
            blocked_ips,
            dispatcher,
            queue,
        }
    }

    /// Validate and normalize a public submission payload
    fn validate(request: SubmitContactRequest) -> Result<SubmitContactRequest, ContactError> {
        let name = request.name.trim().to_string();
        if name.chars().count() < NAME_MIN_LEN {
            return Err(ContactError::Validation(
                "Name must be at least 2 characters".to_string(),
            ));
        }
        if name.chars().count() > NAME_MAX_LEN {
            return Err(ContactError::Validation(
                "Name cannot exceed 100 characters".to_string(),
            ));
        }

        let email = request.email.trim().to_lowercase();
        if email.len() > EMAIL_MAX_LEN || !is_valid_email(&email) {
            return Err(ContactError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        if let Some(phone) = &request.phone {
            if phone.chars().count() > PHONE_MAX_LEN {
                return Err(ContactError::Validation(
                    "Phone cannot exceed 20 characters".to_string(),
                ));
            }
        }

        if let Some(subject) = &request.subject {
            if subject.chars().count() > SUBJECT_MAX_LEN {
                return Err(ContactError::Validation(
                    "Subject cannot exceed 200 characters".to_string(),
                ));
            }
        }

        let message = strip_tags(&request.message).trim().to_string();
        if message.chars().count() < MESSAGE_MIN_LEN {
            return Err(ContactError::Validation(
                "Message must be at least 10 characters".to_string(),
            ));
        }
        if message.chars().count() > MESSAGE_MAX_LEN {
            return Err(ContactError::Validation(
                "Message cannot exceed 5000 characters".to_string(),
            ));
        }

        if Language::parse(&request.language).is_none() {
            return Err(ContactError::Validation(
                "Language must be 'ar' or 'en'".to_string(),
            ));
        }

        if !request.privacy_accepted {
            return Err(ContactError::Validation(
                "The privacy policy must be accepted".to_string(),
            ));
        }

        Ok(SubmitContactRequest {
            name,
            email,
            message,
            ..request
        })
    }

    /// Run the intake pipeline for one public submission.
    ///
    /// Order matters: validation, rate gate and block gate all reject
    /// before anything is persisted. The submission row and its branch
    /// effect (block-list bookkeeping or notification rows) commit in a
    /// single transaction; delivery jobs are published after the commit.
    pub async fn submit(
        &self,
        request: SubmitContactRequest,
        metadata: &RequestMetadata,
    ) -> Result<contact_submissions::Model, ContactError> {
        let request = Self::validate(request)?;

        self.rate_limiter.check(&metadata.ip_address).await?;

        if self.blocked_ips.is_blocked(&metadata.ip_address).await? {
            return Err(ContactError::IpBlocked);
        }

        let score = self
            .scorer
            .score(&SubmissionInput {
                email: &request.email,
                message: &request.message,
                ip_address: &metadata.ip_address,
            })
            .await?;

        let (status, effect) = classify(score);

        let txn = self.db.begin().await?;

        let submission = contact_submissions::ActiveModel {
            name: Set(request.name),
            email: Set(request.email),
            phone: Set(request.phone),
            subject: Set(request.subject),
            message: Set(request.message),
            status: Set(status.as_str().to_string()),
            language: Set(request.language),
            ip_address: Set(Some(metadata.ip_address.clone())),
            user_agent: Set(Some(metadata.user_agent.clone())),
            submitted_at: Set(self.clock.now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let queued = match effect {
            IntakeEffect::RecordSpamHit => {
                self.blocked_ips
                    .record_spam_hit_on(&txn, &metadata.ip_address)
                    .await?;
                Vec::new()
            }
            IntakeEffect::Notify => self.dispatcher.dispatch_on(&txn, &submission).await?,
        };

        txn.commit().await?;

        // Wake the delivery worker for each committed queue row. A lost
        // wakeup is rescued by the worker's periodic sweep.
        for row in &queued {
            if let Err(e) = self
                .queue
                .send(Job::SendQueuedEmail(SendQueuedEmailJob {
                    email_queue_id: row.id,
                }))
                .await
            {
                error!("Failed to publish delivery job for email {}: {}", row.id, e);
            }
        }

        info!(
            "Contact form submitted, submission_id: {}, email: {}, ip: {}, score: {}",
            submission.id, submission.email, metadata.ip_address, score
        );

        Ok(submission)
    }

    /// Paginated, filtered listing; spam excluded by default
    pub async fn get_submissions(
        &self,
        filters: SubmissionFilters,
    ) -> Result<(Vec<contact_submissions::Model>, u64), ContactError> {
        let page = filters.page.unwrap_or(1).max(1);
        let page_size = filters.page_size.unwrap_or(25).clamp(1, 100);

        let mut query = contact_submissions::Entity::find()
            .order_by_desc(contact_submissions::Column::SubmittedAt);

        match &filters.status {
            Some(raw) => {
                let status = SubmissionStatus::parse(raw)
                    .ok_or_else(|| ContactError::UnknownStatus(raw.clone()))?;
                query = query.filter(contact_submissions::Column::Status.eq(status.as_str()));
            }
            None if !filters.include_spam => {
                query = query.filter(
                    contact_submissions::Column::Status.ne(SubmissionStatus::Spam.as_str()),
                );
            }
            None => {}
        }

        if let Some(search) = &filters.search {
            let needle = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(contact_submissions::Column::Name.like(&needle))
                    .add(contact_submissions::Column::Email.like(&needle))
                    .add(contact_submissions::Column::Subject.like(&needle))
                    .add(contact_submissions::Column::Message.like(&needle)),
            );
        }

        if let Some(from) = filters.date_from {
            query = query.filter(contact_submissions::Column::SubmittedAt.gte(from));
        }
        if let Some(to) = filters.date_to {
            query = query.filter(contact_submissions::Column::SubmittedAt.lte(to));
        }

        if let Some(language) = &filters.language {
            query = query.filter(contact_submissions::Column::Language.eq(language));
        }

        let paginator = query.paginate(self.db.as_ref(), page_size);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    /// Fetch one submission; a staff fetch of a `new` submission
    /// transitions it to `read` (read_at set once)
    pub async fn get_submission(
        &self,
        id: i32,
        mark_read: bool,
    ) -> Result<contact_submissions::Model, ContactError> {
        let submission = contact_submissions::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ContactError::SubmissionNotFound(id))?;

        if mark_read && submission.status == SubmissionStatus::New.as_str() {
            let mut active: contact_submissions::ActiveModel = submission.into();
            active.status = Set(SubmissionStatus::Read.as_str().to_string());
            active.read_at = Set(Some(self.clock.now()));
            let updated = active.update(self.db.as_ref()).await?;
            return Ok(updated);
        }

        Ok(submission)
    }

    /// Explicit status update from the moderation surface.
    ///
    /// Transitions are validated against the forward-only graph; moving
    /// to spam runs the block-list side effect for the submitter's IP.
    pub async fn update_status(
        &self,
        id: i32,
        new_status: SubmissionStatus,
        admin_notes: Option<String>,
    ) -> Result<contact_submissions::Model, ContactError> {
        let submission = contact_submissions::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ContactError::SubmissionNotFound(id))?;

        let current = SubmissionStatus::parse(&submission.status)
            .ok_or_else(|| ContactError::UnknownStatus(submission.status.clone()))?;

        if !current.can_transition_to(new_status) {
            return Err(ContactError::InvalidTransition {
                from: current.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        let ip_address = submission.ip_address.clone();
        let old_status = submission.status.clone();

        let txn = self.db.begin().await?;

        let mut active: contact_submissions::ActiveModel = submission.into();
        active.status = Set(new_status.as_str().to_string());
        if let Some(notes) = admin_notes {
            active.admin_notes = Set(Some(notes));
        }
        if new_status == SubmissionStatus::Read {
            active.read_at = Set(Some(self.clock.now()));
        }
        let updated = active.update(&txn).await?;

        if new_status == SubmissionStatus::Spam {
            if let Some(ip) = &ip_address {
                self.blocked_ips.record_spam_hit_on(&txn, ip).await?;
            }
        }

        txn.commit().await?;

        info!(
            "Contact submission status updated, submission_id: {}, old_status: {}, new_status: {}",
            updated.id, old_status, updated.status
        );

        Ok(updated)
    }

    /// Moderation shortcut for the spam transition
    pub async fn mark_as_spam(
        &self,
        id: i32,
    ) -> Result<contact_submissions::Model, ContactError> {
        self.update_status(id, SubmissionStatus::Spam, None).await
    }

    pub async fn delete_submission(&self, id: i32) -> Result<(), ContactError> {
        let submission = contact_submissions::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or(ContactError::SubmissionNotFound(id))?;

        contact_submissions::Entity::delete_by_id(submission.id)
            .exec(self.db.as_ref())
            .await?;

        info!("Deleted contact submission {}", id);
        Ok(())
    }

    pub async fn bulk_update_status(
        &self,
        ids: &[i32],
        status: SubmissionStatus,
    ) -> Result<u64, ContactError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = contact_submissions::Entity::update_many()
            .col_expr(
                contact_submissions::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .filter(contact_submissions::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await?;

        info!(
            "Bulk status update, count: {}, status: {}",
            result.rows_affected, status
        );
        Ok(result.rows_affected)
    }

    pub async fn bulk_delete(&self, ids: &[i32]) -> Result<u64, ContactError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = contact_submissions::Entity::delete_many()
            .filter(contact_submissions::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await?;

        info!("Bulk delete submissions, count: {}", result.rows_affected);
        Ok(result.rows_affected)
    }

    /// Counts by status plus today / this-week / this-month buckets
    pub async fn get_statistics(&self) -> Result<SubmissionStatistics, ContactError> {
        let base = contact_submissions::Entity::find();

        let total = base.clone().count(self.db.as_ref()).await?;

        let mut by_status = [0u64; 5];
        for (i, status) in [
            SubmissionStatus::New,
            SubmissionStatus::Read,
            SubmissionStatus::Replied,
            SubmissionStatus::Archived,
            SubmissionStatus::Spam,
        ]
        .iter()
        .enumerate()
        {
            by_status[i] = base
                .clone()
                .filter(contact_submissions::Column::Status.eq(status.as_str()))
                .count(self.db.as_ref())
                .await?;
        }

        let now = self.clock.now();
        let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start =
            today_start - Duration::days(now.weekday().num_days_from_monday() as i64);
        let month_start = now
            .date_naive()
            .with_day(1)
            .unwrap_or(now.date_naive())
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut buckets = [0u64; 3];
        for (i, boundary) in [today_start, week_start, month_start].iter().enumerate() {
            buckets[i] = base
                .clone()
                .filter(contact_submissions::Column::SubmittedAt.gte(*boundary))
                .count(self.db.as_ref())
                .await?;
        }

        Ok(SubmissionStatistics {
            total,
            new: by_status[0],
            read: by_status[1],
            replied: by_status[2],
            archived: by_status[3],
            spam: by_status[4],
            today: buckets[0],
            this_week: buckets[1],
            this_month: buckets[2],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::MemoryCounterStore;
    use chrono::Utc;
    use mailroom_core::{ManualClock, QueueError};
    use mailroom_database::test_utils::TestDatabase;
    use mailroom_email::services::NewRecipient;
    use mailroom_email::{EmailQueueService, RecipientService};
    use mailroom_entities::{blocked_ips, email_queue, spam_patterns, NotificationPreference};
    use std::sync::Mutex;
    use std::time::Duration as StdDuration;

    /// JobQueue stub that records published jobs
    struct RecordingQueue {
        jobs: Mutex<Vec<Job>>,
    }

    impl RecordingQueue {
        fn new() -> Self {
            Self {
                jobs: Mutex::new(Vec::new()),
            }
        }

        fn published(&self) -> Vec<Job> {
            self.jobs.lock().unwrap().clone()
        }
    }

    #[mailroom_core::async_trait::async_trait]
    impl JobQueue for RecordingQueue {
        async fn send(&self, job: Job) -> Result<(), QueueError> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }

        async fn send_delayed(&self, job: Job, _delay: StdDuration) -> Result<(), QueueError> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }

        fn subscribe(&self) -> Box<dyn mailroom_core::JobReceiver> {
            unimplemented!("not used in these tests")
        }
    }

    struct Harness {
        db: TestDatabase,
        clock: Arc<ManualClock>,
        queue: Arc<RecordingQueue>,
        recipients: Arc<RecipientService>,
        service: ContactService,
    }

    async fn setup_with_limit(rate_limit: u64) -> Harness {
        let db = TestDatabase::with_migrations().await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let queue = Arc::new(RecordingQueue::new());

        let scorer = SpamScorer::new(db.db.clone());
        let rate_limiter = RateLimitService::new(
            Arc::new(MemoryCounterStore::new(clock.clone())),
            rate_limit,
            StdDuration::from_secs(60),
        );
        let blocked_ips = Arc::new(BlockedIpService::new(db.db.clone(), clock.clone()));
        let recipients = Arc::new(RecipientService::new(db.db.clone()));
        let queue_service = Arc::new(EmailQueueService::new(db.db.clone(), clock.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            recipients.clone(),
            queue_service,
            "noreply@example.com".to_string(),
            None,
        ));

        let service = ContactService::new(
            db.db.clone(),
            clock.clone(),
            scorer,
            rate_limiter,
            blocked_ips,
            dispatcher,
            queue.clone(),
        );

        Harness {
            db,
            clock,
            queue,
            recipients,
            service,
        }
    }

    async fn setup() -> Harness {
        setup_with_limit(5).await
    }

    fn request(message: &str) -> SubmitContactRequest {
        SubmitContactRequest {
            name: "John Doe".to_string(),
            email: "john@x.com".to_string(),
            phone: None,
            subject: Some("Project inquiry".to_string()),
            message: message.to_string(),
            language: "en".to_string(),
            privacy_accepted: true,
        }
    }

    fn metadata(ip: &str) -> RequestMetadata {
        RequestMetadata {
            ip_address: ip.to_string(),
            user_agent: "test-agent".to_string(),
        }
    }

    async fn add_immediate_recipient(harness: &Harness, email: &str) {
        harness
            .recipients
            .create(NewRecipient {
                email: email.to_string(),
                name: None,
                is_primary: true,
                is_active: true,
                notification_preference: NotificationPreference::Immediate,
            })
            .await
            .unwrap();
    }

    async fn add_keyword_pattern(harness: &Harness, pattern: &str, weight: i32) {
        spam_patterns::ActiveModel {
            pattern: Set(pattern.to_string()),
            pattern_type: Set("keyword".to_string()),
            weight: Set(weight),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(harness.db.db.as_ref())
        .await
        .unwrap();
    }

    async fn submission_count(harness: &Harness) -> u64 {
        contact_submissions::Entity::find()
            .count(harness.db.db.as_ref())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_clean_submission_is_persisted_as_new_and_fanned_out() {
        let harness = setup().await;
        add_immediate_recipient(&harness, "staff@example.com").await;

        let submission = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        assert_eq!(submission.status, "new");
        assert_eq!(submission.ip_address.as_deref(), Some("203.0.113.7"));

        let rows = email_queue::Entity::find()
            .all(harness.db.db.as_ref())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contact_submission_id, Some(submission.id));

        // One delivery job published per queue row
        assert_eq!(harness.queue.published().len(), 1);
    }

    #[tokio::test]
    async fn test_spam_submission_skips_notification_and_flags_ip() {
        let harness = setup().await;
        add_immediate_recipient(&harness, "staff@example.com").await;
        add_keyword_pattern(&harness, "casino", 5).await;

        let submission = harness
            .service
            .submit(
                request("Best casino bonuses for you"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        assert_eq!(submission.status, "spam");

        // No notification rows, no jobs
        let rows = email_queue::Entity::find()
            .all(harness.db.db.as_ref())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert!(harness.queue.published().is_empty());

        // Block-list bookkeeping ran
        let blocked = blocked_ips::Entity::find()
            .all(harness.db.db.as_ref())
            .await
            .unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].spam_count, 1);
    }

    #[tokio::test]
    async fn test_score_below_threshold_is_new() {
        let harness = setup().await;
        add_keyword_pattern(&harness, "casino", 4).await;

        let submission = harness
            .service
            .submit(
                request("casino is a word in this long message"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        assert_eq!(submission.status, "new");
    }

    #[tokio::test]
    async fn test_sixth_submission_within_window_is_rate_limited() {
        let harness = setup().await;

        for _ in 0..5 {
            harness
                .service
                .submit(
                    request("Hi, interested in your services"),
                    &metadata("203.0.113.7"),
                )
                .await
                .unwrap();
        }

        let result = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await;

        assert!(matches!(result, Err(ContactError::RateLimited)));
        assert_eq!(submission_count(&harness).await, 5);
    }

    #[tokio::test]
    async fn test_blocked_ip_is_rejected_before_persistence() {
        let harness = setup_with_limit(100).await;
        add_keyword_pattern(&harness, "casino", 5).await;

        // Five spam submissions trip the auto-block
        for _ in 0..5 {
            harness
                .service
                .submit(request("casino casino casino"), &metadata("203.0.113.7"))
                .await
                .unwrap();
        }

        let before = submission_count(&harness).await;

        // The sixth attempt is refused at the gate, spam or not
        let result = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await;

        assert!(matches!(result, Err(ContactError::IpBlocked)));
        assert_eq!(submission_count(&harness).await, before);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_any_gate() {
        let harness = setup().await;

        for bad in [
            SubmitContactRequest {
                name: "J".to_string(),
                ..request("Hi, interested in your services")
            },
            SubmitContactRequest {
                email: "not-an-email".to_string(),
                ..request("Hi, interested in your services")
            },
            request("too short"),
            SubmitContactRequest {
                language: "fr".to_string(),
                ..request("Hi, interested in your services")
            },
            SubmitContactRequest {
                privacy_accepted: false,
                ..request("Hi, interested in your services")
            },
        ] {
            let result = harness.service.submit(bad, &metadata("203.0.113.7")).await;
            assert!(matches!(result, Err(ContactError::Validation(_))));
        }

        assert_eq!(submission_count(&harness).await, 0);
    }

    #[tokio::test]
    async fn test_message_html_is_stripped() {
        let harness = setup().await;

        let submission = harness
            .service
            .submit(
                request("Hello <script>alert('x')</script> I need a website"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        assert!(!submission.message.contains('<'));
        assert!(submission.message.contains("I need a website"));
    }

    #[tokio::test]
    async fn test_fetch_auto_marks_new_as_read_once() {
        let harness = setup().await;
        let submission = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        let first = harness
            .service
            .get_submission(submission.id, true)
            .await
            .unwrap();
        assert_eq!(first.status, "read");
        let read_at = first.read_at.unwrap();

        harness.clock.advance(Duration::minutes(5));
        let second = harness
            .service
            .get_submission(submission.id, true)
            .await
            .unwrap();
        assert_eq!(second.status, "read");
        assert_eq!(second.read_at.unwrap(), read_at);
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected() {
        let harness = setup().await;
        let submission = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        harness
            .service
            .update_status(submission.id, SubmissionStatus::Archived, None)
            .await
            .unwrap();

        let result = harness
            .service
            .update_status(submission.id, SubmissionStatus::Read, None)
            .await;
        assert!(matches!(result, Err(ContactError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_marking_spam_twice_increments_count_without_duplicate_rows() {
        let harness = setup().await;
        let submission = harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        harness.service.mark_as_spam(submission.id).await.unwrap();
        harness.service.mark_as_spam(submission.id).await.unwrap();

        let blocked = blocked_ips::Entity::find()
            .all(harness.db.db.as_ref())
            .await
            .unwrap();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].spam_count, 2);
    }

    #[tokio::test]
    async fn test_listing_excludes_spam_by_default() {
        let harness = setup().await;
        add_keyword_pattern(&harness, "casino", 5).await;

        harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();
        harness
            .service
            .submit(request("casino casino casino"), &metadata("198.51.100.9"))
            .await
            .unwrap();

        let (items, total) = harness
            .service
            .get_submissions(SubmissionFilters::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(items.iter().all(|s| s.status != "spam"));

        let (_, total_with_spam) = harness
            .service
            .get_submissions(SubmissionFilters {
                include_spam: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total_with_spam, 2);

        let (spam_only, _) = harness
            .service
            .get_submissions(SubmissionFilters {
                status: Some("spam".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(spam_only.len(), 1);
    }

    #[tokio::test]
    async fn test_search_matches_across_fields() {
        let harness = setup().await;

        harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();

        let (by_name, _) = harness
            .service
            .get_submissions(SubmissionFilters {
                search: Some("John".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let (by_message, _) = harness
            .service
            .get_submissions(SubmissionFilters {
                search: Some("interested".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_message.len(), 1);

        let (none, _) = harness
            .service
            .get_submissions(SubmissionFilters {
                search: Some("nonexistent".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_operations() {
        let harness = setup().await;

        let mut ids = Vec::new();
        for ip in ["203.0.113.1", "203.0.113.2", "203.0.113.3"] {
            let submission = harness
                .service
                .submit(request("Hi, interested in your services"), &metadata(ip))
                .await
                .unwrap();
            ids.push(submission.id);
        }

        let updated = harness
            .service
            .bulk_update_status(&ids[..2], SubmissionStatus::Archived)
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let deleted = harness.service.bulk_delete(&ids).await.unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(submission_count(&harness).await, 0);
    }

    #[tokio::test]
    async fn test_statistics_counts() {
        let harness = setup().await;
        add_keyword_pattern(&harness, "casino", 5).await;

        harness
            .service
            .submit(
                request("Hi, interested in your services"),
                &metadata("203.0.113.7"),
            )
            .await
            .unwrap();
        harness
            .service
            .submit(request("casino casino casino"), &metadata("198.51.100.9"))
            .await
            .unwrap();

        let stats = harness.service.get_statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.new, 1);
        assert_eq!(stats.spam, 1);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.this_month, 2);
    }

    #[test]
    fn test_classify_is_pure_and_threshold_exact() {
        assert_eq!(
            classify(4),
            (SubmissionStatus::New, IntakeEffect::Notify)
        );
        assert_eq!(
            classify(5),
            (SubmissionStatus::Spam, IntakeEffect::RecordSpamHit)
        );
        assert_eq!(
            classify(50),
            (SubmissionStatus::Spam, IntakeEffect::RecordSpamHit)
        );
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>bold</b> text"), "bold text");
        assert_eq!(strip_tags("no tags"), "no tags");
        assert_eq!(strip_tags("a <broken"), "a ");
    }
}
