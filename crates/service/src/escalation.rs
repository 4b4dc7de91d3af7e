use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use uuid::Uuid;

use furlough_core::approvals::{
    Availability, ChainCandidate, ChainPosition, ChainSnapshot, DelegateCandidate,
    ResolvedApprover, OVERLOAD_PENDING_THRESHOLD, OVERLOAD_WINDOW_DAYS,
};
use furlough_core::audit::AuditEvent;
use furlough_core::domain::approval::{Approval, ApprovalId, ApprovalStatus};
use furlough_core::domain::leave::{LeaveRequest, LeaveRequestId, LeaveStatus};
use furlough_core::domain::user::{UserId, UserRecord};
use furlough_core::effects::{Effect, NotificationRequest};
use furlough_core::settings::EscalationConfig;
use furlough_core::workdays;
use furlough_db::repositories::{
    ApprovalRepository, AuditRepository, DelegateRepository, DirectoryRepository,
    HolidayRepository, LeaveRepository, SettingsRepository,
};

use crate::balance::BalanceService;
use crate::clock::Clock;
use crate::dispatch::EffectDispatcher;
use crate::templates::{self, EscalationEmail};
use crate::ServiceError;

const AUTO_APPROVAL_COMMENT: &str =
    "Auto-approved: the approval chain was exhausted at the escalation ceiling";

/// One sweep's tally, logged by the scheduler entry point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: usize,
    pub escalated: usize,
    pub auto_approved: usize,
    pub skipped: usize,
}

enum EscalationOutcome {
    Escalated,
    AutoApproved,
    Skipped,
}

/// Walks approval chains, escalates stale approvals, and records terminal
/// decisions. All time-driven behavior goes through the injected clock.
pub struct EscalationService {
    directory: Arc<dyn DirectoryRepository>,
    leave: Arc<dyn LeaveRepository>,
    approvals: Arc<dyn ApprovalRepository>,
    delegates: Arc<dyn DelegateRepository>,
    holidays: Arc<dyn HolidayRepository>,
    settings: Arc<dyn SettingsRepository>,
    audit: Arc<dyn AuditRepository>,
    balances: BalanceService,
    dispatcher: EffectDispatcher,
    clock: Arc<dyn Clock>,
}

impl EscalationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn DirectoryRepository>,
        leave: Arc<dyn LeaveRepository>,
        approvals: Arc<dyn ApprovalRepository>,
        delegates: Arc<dyn DelegateRepository>,
        holidays: Arc<dyn HolidayRepository>,
        settings: Arc<dyn SettingsRepository>,
        audit: Arc<dyn AuditRepository>,
        balances: BalanceService,
        dispatcher: EffectDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            leave,
            approvals,
            delegates,
            holidays,
            settings,
            audit,
            balances,
            dispatcher,
            clock,
        }
    }

    pub async fn get_escalation_config(&self) -> Result<EscalationConfig, ServiceError> {
        Ok(EscalationConfig::from_settings(&self.settings.all().await?))
    }

    /// Routes a freshly created leave request to its first approver and
    /// marks the requested days pending in the ledger. Unresolvable chains
    /// and missing rows are logged skips, not errors.
    pub async fn process_new_leave_request(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Option<ResolvedApprover>, ServiceError> {
        let Some(request) = self.leave.find_request(request_id).await? else {
            tracing::warn!(
                event_name = "escalation.request_missing",
                request_id = request_id.0.as_str(),
                "leave request not found, nothing to route"
            );
            return Ok(None);
        };
        let Some(requester) = self.directory.find_user(&request.user_id).await? else {
            tracing::warn!(
                event_name = "escalation.requester_missing",
                request_id = request_id.0.as_str(),
                user_id = request.user_id.0.as_str(),
                "requester not in directory, nothing to route"
            );
            return Ok(None);
        };

        let config = self.get_escalation_config().await?;
        let chain = self.chain_for(&requester, &config).await?;
        let resolution = chain.resolve_next(&ChainPosition::Initial);

        // Days go pending once, on the first routing of the request, even
        // when no approver can be resolved yet.
        if self.approvals.list_for_request(request_id).await?.is_empty() {
            self.balances
                .on_pending(
                    &request.user_id,
                    &request.leave_type_id,
                    request.working_days,
                    request.start_date.year(),
                )
                .await?;
        }

        let Some(approver) = resolution.approver else {
            tracing::warn!(
                event_name = "escalation.no_initial_approver",
                request_id = request_id.0.as_str(),
                skipped = resolution.skipped.len(),
                "no resolvable approver for new request"
            );
            return Ok(None);
        };

        let approval = self.pending_approval(&request, approver.user_id(), 1);
        let created = self.approvals.insert_pending(&approval).await?;
        if created {
            self.record_audit(
                AuditEvent::new("APPROVAL_CREATED", "approval", approval.id.0.clone())
                    .by(request.user_id.clone())
                    .with_new(serde_json::json!({
                        "approver_id": approver.user_id().0,
                        "level": 1,
                    })),
            )
            .await;

            self.dispatcher
                .dispatch(vec![Effect::Notify(NotificationRequest {
                    user_id: approver.user_id().clone(),
                    kind: "APPROVAL_REQUESTED".to_string(),
                    title: "Leave approval requested".to_string(),
                    body: format!(
                        "{} requested leave from {} to {}.",
                        requester.full_name, request.start_date, request.end_date
                    ),
                    link: Some(format!("/approvals?request={}", request.id.0)),
                })])
                .await;
        }

        Ok(Some(approver))
    }

    /// The scheduled sweep: escalates every PENDING approval older than the
    /// configured number of business days, auto-approving at the ceiling
    /// when the chain is exhausted.
    pub async fn check_and_escalate_pending_approvals(
        &self,
    ) -> Result<SweepSummary, ServiceError> {
        let config = self.get_escalation_config().await?;
        if !config.enabled {
            tracing::info!(
                event_name = "escalation.sweep_disabled",
                "escalation is disabled, skipping sweep"
            );
            return Ok(SweepSummary::default());
        }

        let holidays: HashSet<NaiveDate> =
            self.holidays.active_dates().await?.into_iter().collect();
        let now_local = self.clock.now_utc().with_timezone(&config.company_offset());
        let threshold = workdays::subtract_business_days(
            now_local,
            config.business_days_before_escalation,
            &holidays,
        )
        .with_timezone(&Utc);

        let stale = self.approvals.list_stale_pending(threshold).await?;
        let mut summary = SweepSummary { scanned: stale.len(), ..SweepSummary::default() };

        for approval in stale {
            match self.escalate_one(&approval, &config).await? {
                EscalationOutcome::Escalated => summary.escalated += 1,
                EscalationOutcome::AutoApproved => summary.auto_approved += 1,
                EscalationOutcome::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            event_name = "escalation.sweep_complete",
            scanned = summary.scanned,
            escalated = summary.escalated,
            auto_approved = summary.auto_approved,
            skipped = summary.skipped,
            "escalation sweep finished"
        );
        Ok(summary)
    }

    /// Approves the open approval of a request; terminal for the request.
    pub async fn approve_request(
        &self,
        request_id: &LeaveRequestId,
        comments: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let Some((request, open)) = self.request_with_open_approval(request_id).await? else {
            return Ok(false);
        };

        let now = self.clock.now_utc();
        self.approvals.decide(&open.id, ApprovalStatus::Approved, comments, now).await?;
        self.leave.set_request_status(request_id, LeaveStatus::Approved).await?;
        self.balances
            .on_approval(
                &request.user_id,
                &request.leave_type_id,
                request.working_days,
                request.start_date.year(),
            )
            .await?;

        self.record_audit(
            AuditEvent::new("APPROVE", "leave_request", request_id.0.clone())
                .by(open.approver_id.clone())
                .with_details(comments.unwrap_or_default()),
        )
        .await;
        self.notify_requester(
            &request,
            "REQUEST_APPROVED",
            "Leave request approved",
            format!(
                "Your leave from {} to {} was approved.",
                request.start_date, request.end_date
            ),
        )
        .await;
        Ok(true)
    }

    /// Rejects the open approval of a request and releases the pending days.
    pub async fn reject_request(
        &self,
        request_id: &LeaveRequestId,
        comments: Option<&str>,
    ) -> Result<bool, ServiceError> {
        let Some((request, open)) = self.request_with_open_approval(request_id).await? else {
            return Ok(false);
        };

        let now = self.clock.now_utc();
        self.approvals.decide(&open.id, ApprovalStatus::Rejected, comments, now).await?;
        self.leave.set_request_status(request_id, LeaveStatus::Rejected).await?;
        self.balances
            .on_rejection(
                &request.user_id,
                &request.leave_type_id,
                request.working_days,
                request.start_date.year(),
            )
            .await?;

        self.record_audit(
            AuditEvent::new("REJECT", "leave_request", request_id.0.clone())
                .by(open.approver_id.clone())
                .with_details(comments.unwrap_or_default()),
        )
        .await;
        self.notify_requester(
            &request,
            "REQUEST_REJECTED",
            "Leave request rejected",
            format!(
                "Your leave from {} to {} was rejected.",
                request.start_date, request.end_date
            ),
        )
        .await;
        Ok(true)
    }

    /// Cancels a request. A pending request releases its pending days; an
    /// already-approved request restores its used days.
    pub async fn cancel_request(&self, request_id: &LeaveRequestId) -> Result<bool, ServiceError> {
        let Some(request) = self.leave.find_request(request_id).await? else {
            return Ok(false);
        };
        let year = request.start_date.year();
        let now = self.clock.now_utc();

        match request.status {
            LeaveStatus::Pending => {
                if let Some(open) = self.approvals.open_for_request(request_id).await? {
                    self.approvals
                        .decide(
                            &open.id,
                            ApprovalStatus::Rejected,
                            Some("Request cancelled by requester"),
                            now,
                        )
                        .await?;
                }
                self.balances
                    .on_rejection(
                        &request.user_id,
                        &request.leave_type_id,
                        request.working_days,
                        year,
                    )
                    .await?;
            }
            LeaveStatus::Approved => {
                self.balances
                    .on_cancellation(
                        &request.user_id,
                        &request.leave_type_id,
                        request.working_days,
                        year,
                    )
                    .await?;
            }
            LeaveStatus::Rejected | LeaveStatus::Cancelled => return Ok(false),
        }

        self.leave.set_request_status(request_id, LeaveStatus::Cancelled).await?;
        self.record_audit(
            AuditEvent::new("CANCEL", "leave_request", request_id.0.clone())
                .by(request.user_id.clone()),
        )
        .await;
        Ok(true)
    }

    async fn escalate_one(
        &self,
        approval: &Approval,
        config: &EscalationConfig,
    ) -> Result<EscalationOutcome, ServiceError> {
        let Some(request) = self.leave.find_request(&approval.leave_request_id).await? else {
            tracing::warn!(
                event_name = "escalation.orphan_approval",
                approval_id = approval.id.0.as_str(),
                "approval references a missing request, skipping"
            );
            return Ok(EscalationOutcome::Skipped);
        };
        if request.status != LeaveStatus::Pending {
            return Ok(EscalationOutcome::Skipped);
        }
        let Some(requester) = self.directory.find_user(&request.user_id).await? else {
            return Ok(EscalationOutcome::Skipped);
        };

        let chain = self.chain_for(&requester, config).await?;
        let resolution = chain.resolve_next(&ChainPosition::At(approval.approver_id.clone()));

        match resolution.approver {
            Some(approver) => {
                let reason = match &approver {
                    ResolvedApprover::Delegate { delegator_id, .. } => format!(
                        "approver {} is absent; delegate substituted",
                        delegator_id.0
                    ),
                    ResolvedApprover::Member { .. } => format!(
                        "no decision within {} business days",
                        config.business_days_before_escalation
                    ),
                };

                let replacement =
                    self.pending_approval(&request, approver.user_id(), approval.level + 1);
                let now = self.clock.now_utc();
                let created =
                    self.approvals.escalate(&approval.id, &reason, now, &replacement).await?;

                self.record_audit(
                    AuditEvent::new("ESCALATE", "approval", approval.id.0.clone())
                        .with_old(serde_json::json!({
                            "approver_id": approval.approver_id.0,
                            "level": approval.level,
                        }))
                        .with_new(serde_json::json!({
                            "approver_id": approver.user_id().0,
                            "level": approval.level + 1,
                            "replacement_created": created,
                        }))
                        .with_details(reason.clone()),
                )
                .await;

                let mut effects = vec![
                    Effect::Notify(NotificationRequest {
                        user_id: approver.user_id().clone(),
                        kind: "APPROVAL_ESCALATED".to_string(),
                        title: "Leave approval escalated to you".to_string(),
                        body: format!(
                            "{}'s leave request ({} to {}) needs your decision.",
                            requester.full_name, request.start_date, request.end_date
                        ),
                        link: Some(format!("/approvals?request={}", request.id.0)),
                    }),
                    Effect::Notify(NotificationRequest {
                        user_id: request.user_id.clone(),
                        kind: "REQUEST_ESCALATED".to_string(),
                        title: "Your leave request was escalated".to_string(),
                        body: format!(
                            "Your leave request ({} to {}) moved to the next approver.",
                            request.start_date, request.end_date
                        ),
                        link: None,
                    }),
                ];
                if let Some(new_approver) = self.directory.find_user(approver.user_id()).await? {
                    effects.push(Effect::Email(templates::escalation_email(EscalationEmail {
                        to: &new_approver.email,
                        approver_name: &new_approver.full_name,
                        requester_name: &requester.full_name,
                        start_date: request.start_date.to_string(),
                        end_date: request.end_date.to_string(),
                        level: approval.level + 1,
                        reason: &reason,
                    })));
                }
                self.dispatcher.dispatch(effects).await;

                Ok(EscalationOutcome::Escalated)
            }
            None => {
                if config.auto_approve_after_max_escalations
                    && approval.level >= config.max_escalation_levels
                {
                    let now = self.clock.now_utc();
                    self.approvals
                        .auto_approve(&approval.id, &request.id, AUTO_APPROVAL_COMMENT, now)
                        .await?;
                    self.balances
                        .on_approval(
                            &request.user_id,
                            &request.leave_type_id,
                            request.working_days,
                            request.start_date.year(),
                        )
                        .await?;

                    self.record_audit(
                        AuditEvent::new("AUTO_APPROVE", "leave_request", request.id.0.clone())
                            .with_details(AUTO_APPROVAL_COMMENT),
                    )
                    .await;

                    let mut effects = vec![Effect::Notify(NotificationRequest {
                        user_id: request.user_id.clone(),
                        kind: "REQUEST_AUTO_APPROVED".to_string(),
                        title: "Leave request auto-approved".to_string(),
                        body: format!(
                            "Your leave from {} to {} was approved automatically.",
                            request.start_date, request.end_date
                        ),
                        link: None,
                    })];
                    effects.push(Effect::Email(templates::auto_approval_email(
                        &requester.email,
                        &requester.full_name,
                        request.start_date.to_string(),
                        request.end_date.to_string(),
                    )));
                    self.dispatcher.dispatch(effects).await;

                    Ok(EscalationOutcome::AutoApproved)
                } else {
                    tracing::warn!(
                        event_name = "escalation.unresolvable",
                        approval_id = approval.id.0.as_str(),
                        level = approval.level,
                        skipped = resolution.skipped.len(),
                        "no next approver and auto-approval not applicable, will retry next sweep"
                    );
                    Ok(EscalationOutcome::Skipped)
                }
            }
        }
    }

    /// Builds the ordered chain snapshot for a requester: manager, then
    /// department director when distinct, then the HR/EXECUTIVE fallback,
    /// each with availability and active delegation baked in.
    async fn chain_for(
        &self,
        requester: &UserRecord,
        config: &EscalationConfig,
    ) -> Result<ChainSnapshot, ServiceError> {
        let mut chain =
            ChainSnapshot::new(requester.id.clone(), config.auto_skip_absent_approvers);
        let today =
            self.clock.now_utc().with_timezone(&config.company_offset()).date_naive();

        if let Some(manager_id) = &requester.manager_id {
            if let Some(manager) = self.directory.find_user(manager_id).await? {
                let candidate = self.candidate_for(&manager, today, config).await?;
                chain.push(candidate);
            }
        }
        if let Some(director_id) = &requester.department_director_id {
            if let Some(director) = self.directory.find_user(director_id).await? {
                let candidate = self.candidate_for(&director, today, config).await?;
                chain.push(candidate);
            }
        }

        let fallback_pool = self.directory.active_fallback_candidates().await?;
        if let Some(fallback) = chain.pick_fallback(&fallback_pool) {
            let candidate = self.candidate_for(fallback, today, config).await?;
            chain.push(candidate);
        }

        Ok(chain)
    }

    async fn candidate_for(
        &self,
        user: &UserRecord,
        today: NaiveDate,
        config: &EscalationConfig,
    ) -> Result<ChainCandidate, ServiceError> {
        let availability = self.availability_of(&user.id, today, config).await?;

        let delegate = match self.delegates.active_for(&user.id, today).await? {
            Some(grant) => {
                let delegate_availability =
                    self.availability_of(&grant.delegate_id, today, config).await?;
                Some(DelegateCandidate {
                    user_id: grant.delegate_id,
                    availability: delegate_availability,
                })
            }
            None => None,
        };

        Ok(ChainCandidate { user_id: user.id.clone(), role: user.role, availability, delegate })
    }

    async fn availability_of(
        &self,
        user_id: &UserId,
        today: NaiveDate,
        config: &EscalationConfig,
    ) -> Result<Availability, ServiceError> {
        if !config.auto_skip_absent_approvers {
            return Ok(Availability::Available);
        }

        if self.leave.has_approved_leave_covering(user_id, today).await? {
            return Ok(Availability::OnLeave);
        }

        let since = self.clock.now_utc() - chrono::Duration::days(OVERLOAD_WINDOW_DAYS);
        let pending = self.approvals.pending_assigned_since(user_id, since).await?;
        if pending > i64::from(OVERLOAD_PENDING_THRESHOLD) {
            return Ok(Availability::Overloaded);
        }

        Ok(Availability::Available)
    }

    fn pending_approval(
        &self,
        request: &LeaveRequest,
        approver_id: &UserId,
        level: u32,
    ) -> Approval {
        Approval {
            id: ApprovalId(Uuid::new_v4().to_string()),
            leave_request_id: request.id.clone(),
            approver_id: approver_id.clone(),
            level,
            status: ApprovalStatus::Pending,
            escalated_to_id: None,
            escalated_at: None,
            escalation_reason: None,
            comments: None,
            created_at: self.clock.now_utc(),
            decided_at: None,
        }
    }

    async fn request_with_open_approval(
        &self,
        request_id: &LeaveRequestId,
    ) -> Result<Option<(LeaveRequest, Approval)>, ServiceError> {
        let Some(request) = self.leave.find_request(request_id).await? else {
            return Ok(None);
        };
        if request.status != LeaveStatus::Pending {
            return Ok(None);
        }
        let Some(open) = self.approvals.open_for_request(request_id).await? else {
            return Ok(None);
        };
        Ok(Some((request, open)))
    }

    async fn notify_requester(
        &self,
        request: &LeaveRequest,
        kind: &str,
        title: &str,
        body: String,
    ) {
        self.dispatcher
            .dispatch(vec![Effect::Notify(NotificationRequest {
                user_id: request.user_id.clone(),
                kind: kind.to_string(),
                title: title.to_string(),
                body,
                link: None,
            })])
            .await;
    }

    async fn record_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.append(&event).await {
            tracing::warn!(
                event_name = "escalation.audit_failed",
                action = event.action.as_str(),
                entity_id = event.entity_id.as_str(),
                error = %error,
                "audit write failed, continuing"
            );
        }
    }
}
