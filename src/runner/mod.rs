//! Smoke-test runner
//!
//! Drives the fixed checklist against the API: health check, login with a
//! known account or register a new one, then every authenticated step in
//! order. Session state flows from one step into the next.

mod report;
mod session;
mod steps;

pub use report::{Outcome, OutcomeKind, Report, StepResult};
pub use session::{Account, Session};
pub use steps::{Step, AUTHENTICATED_STEPS};

use tracing::{info, warn};

use crate::api::{ApiClient, Transport};

use steps::StepContext;

/// Accounts and passwords used by a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Pre-existing account tried before registering
    pub known_account: Option<Account>,
    /// Account registered when the known one is absent or rejected
    pub new_account: Account,
    /// Password set by the change-password step
    pub new_password: String,
}

/// Executes steps and keeps the session and report
pub struct Runner<T> {
    api: ApiClient<T>,
    session: Session,
    settings: RunSettings,
    report: Report,
}

impl<T: Transport> Runner<T> {
    pub fn new(api: ApiClient<T>, settings: RunSettings, report: Report) -> Self {
        Self {
            api,
            session: Session::default(),
            settings,
            report,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Run a single step and record its outcome
    ///
    /// A step whose precondition is missing is recorded as skipped without
    /// touching the network. Transport errors fail the step and the run
    /// moves on.
    pub async fn execute(&mut self, step: Step) -> OutcomeKind {
        if let Some(reason) = step.missing_precondition(&self.session, &self.settings) {
            let result = StepResult::skip(reason);
            self.report.record(&result);
            return result.outcome.kind();
        }

        let (method, path) = step.route(&self.session);
        self.report
            .header(&format!("{}. {}", step.number(), step.title()));
        self.report.request(method, &path);

        let mut ctx = StepContext {
            api: &self.api,
            session: &mut self.session,
            settings: &self.settings,
            report: &mut self.report,
        };
        let result = match steps::perform(step, &mut ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(step = ?step, error = %e, "Step aborted");
                if e.is_transport() {
                    StepResult::fail(format!("Request failed: {}", e))
                } else {
                    StepResult::fail(e.to_string())
                }
            }
        };
        let result = if step.is_soft() { result.soften() } else { result };

        self.report.record(&result);
        result.outcome.kind()
    }

    /// Run the whole checklist and return the final report
    pub async fn run(&mut self) -> &Report {
        info!(base_url = %self.api.base_url(), "Starting smoke test run");
        self.report.title("CUPID API SMOKE TEST", self.api.base_url());

        self.execute(Step::HealthCheck).await;

        let logged_in = self.settings.known_account.is_some()
            && self.execute(Step::LoginKnownAccount).await == OutcomeKind::Passed;

        if !logged_in {
            self.report
                .info("No usable existing account, registering a new one");
            self.execute(Step::Register).await;
            self.execute(Step::LoginNewAccount).await;
        }

        if !self.session.is_authenticated() {
            self.report
                .notice("Login failed, skipping steps that need authentication");
            self.report.print_summary();
            return &self.report;
        }

        for step in AUTHENTICATED_STEPS {
            self.execute(step).await;
        }

        info!(
            passed = self.report.passed(),
            failed = self.report.failed(),
            skipped = self.report.skipped(),
            "Smoke test run finished"
        );
        self.report.print_summary();
        &self.report
    }
}
