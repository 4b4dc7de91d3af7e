use std::sync::Arc;

use uuid::Uuid;

use furlough_core::audit::AuditEvent;
use furlough_core::domain::planning::{
    HolidayPlan, PlanDate, PlanId, PlanStatus, PlanningWindow, WindowId,
};
use furlough_core::domain::user::UserId;
use furlough_core::effects::{Effect, NotificationRequest};
use furlough_core::errors::DomainError;
use furlough_core::planning::{
    analyze_team, default_window_dates, next_stage, plan, TeamAnalysis, TeamPlan,
};
use furlough_core::settings::EscalationConfig;
use furlough_db::repositories::{
    AuditRepository, DirectoryRepository, PlanningRepository, SettingsRepository,
};

use crate::clock::Clock;
use crate::dispatch::EffectDispatcher;
use crate::templates;
use crate::ServiceError;

/// Holiday-year planning: window lifecycle, per-user plan drafts and
/// submissions, and team-level overlap/gap analysis.
pub struct PlanningService {
    planning: Arc<dyn PlanningRepository>,
    directory: Arc<dyn DirectoryRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: Arc<dyn AuditRepository>,
    dispatcher: EffectDispatcher,
    clock: Arc<dyn Clock>,
}

impl PlanningService {
    pub fn new(
        planning: Arc<dyn PlanningRepository>,
        directory: Arc<dyn DirectoryRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: Arc<dyn AuditRepository>,
        dispatcher: EffectDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { planning, directory, settings, audit, dispatcher, clock }
    }

    /// Returns the window for `year`, creating it lazily and refreshing its
    /// wall-clock-driven stage. Refreshing twice at the same instant is a
    /// no-op.
    pub async fn current_window(&self, year: i32) -> Result<PlanningWindow, ServiceError> {
        let config = EscalationConfig::from_settings(&self.settings.all().await?);
        let now_local = self.clock.now_utc().with_timezone(&config.company_offset());
        let stage = next_stage(now_local, year);

        match self.planning.find_window_by_year(year).await? {
            Some(mut window) => {
                if window.stage != stage {
                    self.planning.set_window_stage(&window.id, stage).await?;
                    window.stage = stage;
                }
                Ok(window)
            }
            None => {
                let (opens_on, closes_on) = default_window_dates(year);
                let window = PlanningWindow {
                    id: WindowId(Uuid::new_v4().to_string()),
                    year,
                    opens_on,
                    closes_on,
                    stage,
                    is_active: true,
                };
                self.planning.insert_window(&window).await?;
                Ok(window)
            }
        }
    }

    /// Atomically replaces a user's planned date set, creating the plan on
    /// first use. Rejects frozen windows/plans and over-cap date sets.
    pub async fn create_or_update_plan(
        &self,
        user_id: &UserId,
        year: i32,
        dates: Vec<PlanDate>,
    ) -> Result<HolidayPlan, ServiceError> {
        let window = self.current_window(year).await?;
        let existing = self.planning.find_plan(user_id, year).await?;
        let status = existing.as_ref().map(|p| p.status).unwrap_or(PlanStatus::Draft);

        plan::validate_date_change(&window, status, dates.len())?;

        let plan_id = match existing {
            Some(plan) => plan.id,
            None => {
                let fresh = self.empty_draft(user_id, &window, year);
                self.planning.insert_plan(&fresh).await?;
                fresh.id
            }
        };

        let version = self.planning.replace_dates(&plan_id, &dates).await?;
        self.record_audit(
            AuditEvent::new("PLAN_DATES_REPLACED", "holiday_plan", plan_id.0.clone())
                .by(user_id.clone())
                .with_new(serde_json::json!({
                    "date_count": dates.len(),
                    "version": version,
                })),
        )
        .await;

        let updated = self
            .planning
            .find_plan(user_id, year)
            .await?
            .ok_or_else(|| DomainError::InvariantViolation("plan vanished mid-update".into()))?;
        Ok(updated)
    }

    /// Submits (or re-submits) a user's plan, creating an empty draft if
    /// none exists, and tells the direct manager about it best-effort.
    pub async fn submit_plan(
        &self,
        user_id: &UserId,
        year: i32,
    ) -> Result<HolidayPlan, ServiceError> {
        let window = self.current_window(year).await?;
        let existing = match self.planning.find_plan(user_id, year).await? {
            Some(plan) => plan,
            None => {
                let fresh = self.empty_draft(user_id, &window, year);
                self.planning.insert_plan(&fresh).await?;
                fresh
            }
        };

        let next = plan::transition(existing.status, plan::PlanEvent::Submit)?;
        let submitted_at = self.clock.now_utc();
        self.planning.set_plan_status(&existing.id, next, Some(submitted_at)).await?;

        self.record_audit(
            AuditEvent::new("PLAN_SUBMITTED", "holiday_plan", existing.id.0.clone())
                .by(user_id.clone())
                .with_new(serde_json::json!({ "status": next.to_string() })),
        )
        .await;

        self.notify_manager_of_submission(user_id, year, existing.dates.len()).await?;

        let updated = self
            .planning
            .find_plan(user_id, year)
            .await?
            .ok_or_else(|| DomainError::InvariantViolation("plan vanished mid-submit".into()))?;
        Ok(updated)
    }

    /// Manager-side review transition.
    pub async fn review_plan(&self, user_id: &UserId, year: i32) -> Result<(), ServiceError> {
        self.transition_plan(user_id, year, plan::PlanEvent::Review, "PLAN_REVIEWED").await
    }

    /// Manager-side finalize transition.
    pub async fn finalize_plan(&self, user_id: &UserId, year: i32) -> Result<(), ServiceError> {
        self.transition_plan(user_id, year, plan::PlanEvent::Finalize, "PLAN_FINALIZED").await
    }

    /// Builds the team calendar and flags overlapping days and extended
    /// gaps. Scope is the manager's direct reports, or the whole department
    /// when the caller is its director.
    pub async fn detect_overlaps_and_gaps(
        &self,
        manager_id: &UserId,
        year: i32,
        is_department_director: bool,
    ) -> Result<TeamAnalysis, ServiceError> {
        let team = if is_department_director {
            self.directory.department_members(manager_id).await?
        } else {
            self.directory.direct_reports(manager_id).await?
        };
        let user_ids: Vec<UserId> = team.into_iter().map(|user| user.id).collect();

        let plans = self.planning.plans_for_users(&user_ids, year).await?;
        let team_plans: Vec<TeamPlan> = plans
            .into_iter()
            .map(|plan| TeamPlan { user_id: plan.user_id, dates: plan.dates })
            .collect();

        Ok(analyze_team(&team_plans))
    }

    fn empty_draft(&self, user_id: &UserId, window: &PlanningWindow, year: i32) -> HolidayPlan {
        HolidayPlan {
            id: PlanId(Uuid::new_v4().to_string()),
            user_id: user_id.clone(),
            window_id: window.id.clone(),
            year,
            status: PlanStatus::Draft,
            version: 0,
            submitted_at: None,
            dates: Vec::new(),
        }
    }

    async fn transition_plan(
        &self,
        user_id: &UserId,
        year: i32,
        event: plan::PlanEvent,
        action: &str,
    ) -> Result<(), ServiceError> {
        let existing = self.planning.find_plan(user_id, year).await?.ok_or_else(|| {
            DomainError::InvariantViolation(format!("no plan for user {} in {year}", user_id.0))
        })?;

        let next = plan::transition(existing.status, event)?;
        self.planning.set_plan_status(&existing.id, next, None).await?;
        self.record_audit(
            AuditEvent::new(action, "holiday_plan", existing.id.0.clone())
                .with_new(serde_json::json!({ "status": next.to_string() })),
        )
        .await;
        Ok(())
    }

    async fn notify_manager_of_submission(
        &self,
        user_id: &UserId,
        year: i32,
        date_count: usize,
    ) -> Result<(), ServiceError> {
        let Some(user) = self.directory.find_user(user_id).await? else {
            return Ok(());
        };
        let Some(manager_id) = &user.manager_id else {
            return Ok(());
        };
        let Some(manager) = self.directory.find_user(manager_id).await? else {
            return Ok(());
        };

        self.dispatcher
            .dispatch(vec![
                Effect::Notify(NotificationRequest {
                    user_id: manager.id.clone(),
                    kind: "PLAN_SUBMITTED".to_string(),
                    title: "Holiday plan submitted".to_string(),
                    body: format!(
                        "{} submitted a holiday plan for {year} with {date_count} day(s).",
                        user.full_name
                    ),
                    link: Some(format!("/planning/{year}")),
                }),
                Effect::Email(templates::plan_submitted_email(
                    &manager.email,
                    &manager.full_name,
                    &user.full_name,
                    year,
                    date_count,
                )),
            ])
            .await;
        Ok(())
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.append(&event).await {
            tracing::warn!(
                event_name = "planning.audit_failed",
                action = event.action.as_str(),
                entity_id = event.entity_id.as_str(),
                error = %error,
                "audit write failed, continuing"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, NaiveDate, Utc};

    use furlough_core::domain::planning::{PlanDate, PlanPriority, PlanStatus, WindowStage};
    use furlough_core::domain::user::UserId;
    use furlough_core::errors::DomainError;
    use furlough_core::planning::OverlapRisk;
    use furlough_db::repositories::{
        NotificationRepository, SqlAuditRepository, SqlDirectoryRepository,
        SqlNotificationRepository, SqlPlanningRepository, SqlSettingsRepository,
    };
    use furlough_db::{connect_with_settings, migrations, SeedOrg};

    use super::PlanningService;
    use crate::clock::ManualClock;
    use crate::dispatch::EffectDispatcher;
    use crate::mailer::RecordingMailer;
    use crate::ServiceError;

    struct Harness {
        pool: sqlx::SqlitePool,
        service: PlanningService,
        clock: ManualClock,
        mailer: RecordingMailer,
    }

    // Mid-November 2026: the 2027 window is open.
    fn planning_season() -> DateTime<Utc> {
        "2026-11-15T10:00:00Z".parse().expect("valid timestamp")
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, m, d).expect("valid date")
    }

    fn entry(d: NaiveDate, priority: PlanPriority) -> PlanDate {
        PlanDate { date: d, priority, reason: None }
    }

    async fn harness() -> Harness {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SeedOrg::load(&pool).await.expect("seed");

        let clock = ManualClock::at(planning_season());
        let mailer = RecordingMailer::default();
        let dispatcher = EffectDispatcher::new(
            Arc::new(SqlNotificationRepository::new(pool.clone())),
            Arc::new(mailer.clone()),
        );
        let service = PlanningService::new(
            Arc::new(SqlPlanningRepository::new(pool.clone())),
            Arc::new(SqlDirectoryRepository::new(pool.clone())),
            Arc::new(SqlSettingsRepository::new(pool.clone())),
            Arc::new(SqlAuditRepository::new(pool.clone())),
            dispatcher,
            Arc::new(clock.clone()),
        );

        Harness { pool, service, clock, mailer }
    }

    fn ada() -> UserId {
        UserId("u-emp-ada".to_string())
    }

    fn ben() -> UserId {
        UserId("u-emp-ben".to_string())
    }

    #[tokio::test]
    async fn window_is_created_lazily_and_stage_follows_the_clock() {
        let h = harness().await;

        let window = h.service.current_window(2027).await.expect("window");
        assert_eq!(window.stage, WindowStage::Open);
        assert_eq!(window.opens_on.to_string(), "2026-10-01");

        // Fetching again at the same instant changes nothing.
        let again = h.service.current_window(2027).await.expect("window");
        assert_eq!(again.id, window.id);
        assert_eq!(again.stage, WindowStage::Open);

        // After the planned year passes, the same window is locked.
        h.clock.set("2028-02-01T10:00:00Z".parse().expect("valid"));
        let locked = h.service.current_window(2027).await.expect("window");
        assert_eq!(locked.id, window.id);
        assert_eq!(locked.stage, WindowStage::Locked);
    }

    #[tokio::test]
    async fn plan_updates_replace_dates_and_bump_versions() {
        let h = harness().await;

        let plan = h
            .service
            .create_or_update_plan(
                &ada(),
                2027,
                vec![entry(date(7, 1), PlanPriority::Essential)],
            )
            .await
            .expect("create");
        assert_eq!(plan.version, 1);
        assert_eq!(plan.dates.len(), 1);
        assert_eq!(plan.status, PlanStatus::Draft);

        let plan = h
            .service
            .create_or_update_plan(
                &ada(),
                2027,
                vec![
                    entry(date(8, 10), PlanPriority::Preferred),
                    entry(date(8, 11), PlanPriority::Preferred),
                ],
            )
            .await
            .expect("update");
        assert_eq!(plan.version, 2);
        let stored: Vec<NaiveDate> = plan.dates.iter().map(|d| d.date).collect();
        assert_eq!(stored, vec![date(8, 10), date(8, 11)]);
    }

    #[tokio::test]
    async fn a_thirty_first_date_is_rejected_without_touching_the_plan() {
        let h = harness().await;

        let thirty: Vec<PlanDate> = (1..=30)
            .map(|d| entry(date(7, d), PlanPriority::Preferred))
            .collect();
        let plan =
            h.service.create_or_update_plan(&ada(), 2027, thirty).await.expect("thirty is fine");
        assert_eq!(plan.dates.len(), 30);

        let thirty_one: Vec<PlanDate> =
            (1..=31).map(|d| entry(date(8, d), PlanPriority::Preferred)).collect();
        let error = h
            .service
            .create_or_update_plan(&ada(), 2027, thirty_one)
            .await
            .expect_err("over the cap");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::PlanDateLimitExceeded { count: 31, max: 30 })
        ));

        // The stored plan is untouched: all thirty July dates, same version.
        let stored = SqlPlanningRepository::new(h.pool.clone());
        use furlough_db::repositories::PlanningRepository;
        let plan = stored.find_plan(&ada(), 2027).await.expect("find").expect("exists");
        assert_eq!(plan.dates.len(), 30);
        assert_eq!(plan.version, 1);
    }

    #[tokio::test]
    async fn locked_window_rejects_all_date_changes() {
        let h = harness().await;
        h.clock.set("2028-02-01T10:00:00Z".parse().expect("valid"));

        let error = h
            .service
            .create_or_update_plan(&ada(), 2027, vec![entry(date(7, 1), PlanPriority::Preferred)])
            .await
            .expect_err("locked window");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::WindowNotWritable { stage: WindowStage::Locked })
        ));
    }

    #[tokio::test]
    async fn submission_creates_a_draft_if_needed_and_emails_the_manager() {
        let h = harness().await;

        let plan = h.service.submit_plan(&ada(), 2027).await.expect("submit");
        assert_eq!(plan.status, PlanStatus::Submitted);
        let first_submit = plan.submitted_at.expect("stamped");

        // Re-submission is allowed and refreshes the timestamp.
        h.clock.set("2026-11-20T10:00:00Z".parse().expect("valid"));
        let plan = h.service.submit_plan(&ada(), 2027).await.expect("resubmit");
        let second_submit = plan.submitted_at.expect("stamped");
        assert!(second_submit > first_submit);

        // Only the direct manager hears about it.
        let manager_inbox = SqlNotificationRepository::new(h.pool.clone())
            .list_for_user(&UserId("u-mgr-app".to_string()))
            .await
            .expect("inbox");
        assert_eq!(manager_inbox.len(), 2);
        assert!(manager_inbox.iter().all(|n| n.kind == "PLAN_SUBMITTED"));

        let director_inbox = SqlNotificationRepository::new(h.pool.clone())
            .list_for_user(&UserId("u-dir-eng".to_string()))
            .await
            .expect("inbox");
        assert!(director_inbox.is_empty());

        let mail = h.mailer.sent();
        assert_eq!(mail.len(), 2);
        assert!(mail.iter().all(|m| m.to == "mikel.sousa@company.test"));
    }

    #[tokio::test]
    async fn review_and_finalize_walk_the_plan_machine() {
        let h = harness().await;

        h.service.submit_plan(&ada(), 2027).await.expect("submit");
        h.service.review_plan(&ada(), 2027).await.expect("review");
        h.service.finalize_plan(&ada(), 2027).await.expect("finalize");

        use furlough_db::repositories::PlanningRepository;
        let plan = SqlPlanningRepository::new(h.pool.clone())
            .find_plan(&ada(), 2027)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(plan.status, PlanStatus::Finalized);

        // Finalized plans no longer accept date changes.
        let error = h
            .service
            .create_or_update_plan(&ada(), 2027, vec![entry(date(7, 1), PlanPriority::Preferred)])
            .await
            .expect_err("finalized plan");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::PlanNotWritable { status: PlanStatus::Finalized })
        ));

        // Review out of order is rejected.
        let error = h.service.review_plan(&ada(), 2027).await.expect_err("already finalized");
        assert!(matches!(
            error,
            ServiceError::Domain(DomainError::InvalidPlanTransition { .. })
        ));
    }

    #[tokio::test]
    async fn team_analysis_flags_overlaps_and_gaps_for_direct_reports() {
        let h = harness().await;

        h.service
            .create_or_update_plan(
                &ada(),
                2027,
                vec![
                    entry(date(7, 1), PlanPriority::Essential),
                    entry(date(7, 20), PlanPriority::Preferred),
                ],
            )
            .await
            .expect("ada plan");
        h.service
            .create_or_update_plan(&ben(), 2027, vec![entry(date(7, 1), PlanPriority::Essential)])
            .await
            .expect("ben plan");

        let analysis = h
            .service
            .detect_overlaps_and_gaps(&UserId("u-mgr-app".to_string()), 2027, false)
            .await
            .expect("analysis");

        assert_eq!(analysis.overlaps.len(), 1);
        assert_eq!(analysis.overlaps[0].date, date(7, 1));
        assert_eq!(analysis.overlaps[0].risk, OverlapRisk::High);

        assert_eq!(analysis.gaps.len(), 1);
        assert_eq!(analysis.gaps[0].gap_days, 19);

        // Director scope covers the same people here, plus nobody else has
        // plans, so the finding set matches.
        let director_view = h
            .service
            .detect_overlaps_and_gaps(&UserId("u-dir-eng".to_string()), 2027, true)
            .await
            .expect("director analysis");
        assert_eq!(director_view.overlaps.len(), 1);
    }
}
