//! Wizard State Machine: the linear three-step flow of one analysis session.
//!
//! ```text
//! CollectAsset --advance--> ConfigureAnalysis --complete(result)--> ShowResult
//!      ^                          |                                      |
//!      +----------back------------+                                      |
//!      +-------------------------------reset-----------------------------+
//! ```
//! Every other transition is rejected and leaves the session untouched.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::wizard::models::{AnalysisResult, AnalysisType, AssetForm, AssetType};

/// Wizard step. `index()` gives the 1-based number the front end shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    CollectAsset,
    ConfigureAnalysis,
    ShowResult,
}

impl Step {
    pub fn index(self) -> u8 {
        match self {
            Step::CollectAsset => 1,
            Step::ConfigureAnalysis => 2,
            Step::ShowResult => 3,
        }
    }
}

/// Form, step and result of one wizard run.
///
/// `result` is `Some` exactly when `step == ShowResult`.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    form: AssetForm,
    result: Option<AnalysisResult>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(AssetForm::default())
    }
}

impl Wizard {
    pub fn new(form: AssetForm) -> Self {
        Self {
            step: Step::CollectAsset,
            form,
            result: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn form(&self) -> &AssetForm {
        &self.form
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Replaces the step-1 fields. Only allowed while collecting the asset.
    pub fn edit_identification(
        &mut self,
        address: String,
        postal_code: String,
        asset_type: AssetType,
    ) -> Result<(), AppError> {
        self.require_step(Step::CollectAsset, "edit the asset identification")?;
        self.form.address = address;
        self.form.postal_code = postal_code;
        self.form.asset_type = asset_type;
        Ok(())
    }

    /// Replaces the step-2 fields. Only allowed while configuring the analysis.
    /// Fields left as `None` keep their current value.
    pub fn edit_configuration(&mut self, update: ConfigurationUpdate) -> Result<(), AppError> {
        self.require_step(Step::ConfigureAnalysis, "edit the analysis configuration")?;
        let mut candidate = self.form.clone();
        if let Some(kind) = update.analysis_type {
            candidate.analysis_type = kind;
        }
        if let Some(gla) = update.gla {
            candidate.gla = gla;
        }
        if let Some(year) = update.build_year {
            candidate.build_year = year;
        }
        if let Some(pue) = update.pue {
            candidate.pue = pue;
        }
        candidate.validate_configuration()?;
        self.form = candidate;
        Ok(())
    }

    /// Step 1 → 2.
    pub fn advance(&mut self) -> Result<(), AppError> {
        self.require_step(Step::CollectAsset, "advance")?;
        self.form.validate_identification()?;
        self.step = Step::ConfigureAnalysis;
        Ok(())
    }

    /// Step 2 → 1.
    pub fn back(&mut self) -> Result<(), AppError> {
        self.require_step(Step::ConfigureAnalysis, "go back")?;
        self.step = Step::CollectAsset;
        Ok(())
    }

    /// Checks that an analysis may be submitted from the current state.
    pub fn ensure_can_submit(&self) -> Result<(), AppError> {
        self.require_step(Step::ConfigureAnalysis, "submit an analysis")?;
        self.form.validate_configuration()
    }

    /// Step 2 → 3, carrying the result of a successful model call.
    pub fn complete(&mut self, result: AnalysisResult) -> Result<(), AppError> {
        self.require_step(Step::ConfigureAnalysis, "show a result")?;
        self.result = Some(result);
        self.step = Step::ShowResult;
        Ok(())
    }

    /// Step 3 → 1. Drops the result, keeps what the user typed.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.require_step(Step::ShowResult, "start another analysis")?;
        self.result = None;
        self.step = Step::CollectAsset;
        Ok(())
    }

    fn require_step(&self, step: Step, action: &str) -> Result<(), AppError> {
        if self.step == step {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "cannot {action} from step {}",
                self.step.index()
            )))
        }
    }
}

/// Partial update of the step-2 fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationUpdate {
    pub analysis_type: Option<AnalysisType>,
    pub gla: Option<String>,
    pub build_year: Option<String>,
    pub pue: Option<String>,
}
