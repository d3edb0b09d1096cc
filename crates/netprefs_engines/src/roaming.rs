#![forbid(unsafe_code)]

use netprefs_kernel_contracts::roaming::{
    DialogType, RoamingDecision, RoamingDecisionInput, SubscriptionId, SubscriptionState,
};
use netprefs_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};
use tracing::{debug, warn};

pub mod reason_codes {
    use netprefs_kernel_contracts::ReasonCodeId;

    // ROAMING reason-code namespace.
    pub const ROAM_APPLY_DIRECT: ReasonCodeId = ReasonCodeId(0x524D_0001);
    pub const ROAM_ENABLE_CHARGE_WARNING: ReasonCodeId = ReasonCodeId(0x524D_0002);
    pub const ROAM_DISABLE_DROPS_CIWLAN_CALL: ReasonCodeId = ReasonCodeId(0x524D_0003);
    pub const ROAM_NOT_DDS_OWNER: ReasonCodeId = ReasonCodeId(0x524D_0004);
    pub const ROAM_NOT_ROAMING: ReasonCodeId = ReasonCodeId(0x524D_0005);

    pub const ROAM_INPUT_SCHEMA_INVALID: ReasonCodeId = ReasonCodeId(0x524D_00F1);
}

/// Raised when a snapshot does not cover the subscriptions it references, or breaks any
/// other input contract. Callers must build complete snapshots; this is never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid roaming decision input: {0}")]
pub struct InvalidInputError(#[from] pub ContractViolation);

impl InvalidInputError {
    pub fn reason_code(&self) -> ReasonCodeId {
        reason_codes::ROAM_INPUT_SCHEMA_INVALID
    }
}

/// Decision plus the reason it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RoamingEvaluation {
    pub decision: RoamingDecision,
    pub reason_code: ReasonCodeId,
    /// Subscription whose C_IWLAN state drove the disable-path check, when that check ran.
    pub checked_sub_id: Option<SubscriptionId>,
}

/// Stateless: every call sees only the snapshot it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoamingDecisionRuntime;

impl RoamingDecisionRuntime {
    pub fn new() -> Self {
        Self
    }

    pub fn mvp_v1() -> Self {
        Self
    }

    pub fn decide(
        &self,
        input: &RoamingDecisionInput,
    ) -> Result<RoamingDecision, InvalidInputError> {
        self.evaluate(input).map(|e| e.decision)
    }

    pub fn evaluate(
        &self,
        input: &RoamingDecisionInput,
    ) -> Result<RoamingEvaluation, InvalidInputError> {
        if let Err(violation) = input.validate() {
            warn!(
                target_sub_id = %input.target_sub_id,
                %violation,
                "rejecting roaming decision input"
            );
            return Err(violation.into());
        }

        if input.requested_enable
            && !input.current_roaming_enabled
            && !input.charge_indication_disabled
        {
            return Ok(finish(
                RoamingDecision::RequireConfirmation {
                    dialog_type: DialogType::EnableRoamingChargeWarning,
                },
                reason_codes::ROAM_ENABLE_CHARGE_WARNING,
                None,
            ));
        }

        if !input.is_roaming_now {
            debug!(target_sub_id = %input.target_sub_id, "not roaming");
            return Ok(finish(
                RoamingDecision::ApplyDirectly,
                reason_codes::ROAM_NOT_ROAMING,
                None,
            ));
        }

        // With multi-SIM C_IWLAN only the DDS controller owns the call-drop warning.
        if input.multi_sim_ciwlan_supported && input.target_sub_id != input.default_data_sub_id {
            debug!(
                target_sub_id = %input.target_sub_id,
                dds = %input.default_data_sub_id,
                "roaming toggle is on the nDDS, not evaluated"
            );
            return Ok(finish(
                RoamingDecision::NotApplicable,
                reason_codes::ROAM_NOT_DDS_OWNER,
                None,
            ));
        }

        let checked = sub_to_check(input)?;
        let Some(state) = lookup(input, checked)? else {
            debug!(dds = %input.default_data_sub_id, "no valid DDS to check");
            return Ok(finish(
                RoamingDecision::ApplyDirectly,
                reason_codes::ROAM_APPLY_DIRECT,
                None,
            ));
        };
        debug!(
            dds = %input.default_data_sub_id,
            sub_to_check = %checked,
            in_call = state.in_call,
            ciwlan_enabled = state.ciwlan_enabled,
            in_ciwlan_only_mode = state.in_ciwlan_only_mode,
            ciwlan_mode_supported = state.ciwlan_mode_supported,
            ims_registered_on_ciwlan = state.ims_registered_on_ciwlan,
            "checking C_IWLAN call state"
        );
        if state.ciwlan_call_at_risk() {
            return Ok(finish(
                RoamingDecision::RequireConfirmation {
                    dialog_type: DialogType::DisableRoamingDropsCiwlanCall,
                },
                reason_codes::ROAM_DISABLE_DROPS_CIWLAN_CALL,
                Some(checked),
            ));
        }
        Ok(finish(
            RoamingDecision::ApplyDirectly,
            reason_codes::ROAM_APPLY_DIRECT,
            Some(checked),
        ))
    }
}

/// Decides a single roaming toggle change with the default runtime.
pub fn decide(input: &RoamingDecisionInput) -> Result<RoamingDecision, InvalidInputError> {
    RoamingDecisionRuntime::mvp_v1().decide(input)
}

// Only ever DDS or nDDS; other active subscriptions are never considered.
fn sub_to_check(input: &RoamingDecisionInput) -> Result<SubscriptionId, ContractViolation> {
    let dds = input.default_data_sub_id;
    if !input.multi_sim_ciwlan_supported {
        return Ok(dds);
    }
    let ndds = input.non_default_data_sub_id;
    match lookup(input, ndds)? {
        Some(state) if state.ciwlan_call_at_risk() => Ok(ndds),
        _ => Ok(dds),
    }
}

fn lookup(
    input: &RoamingDecisionInput,
    sub_id: SubscriptionId,
) -> Result<Option<&SubscriptionState>, ContractViolation> {
    if !sub_id.is_valid() {
        return Ok(None);
    }
    input
        .subscriptions
        .get(sub_id)
        .map(Some)
        .ok_or(ContractViolation::MissingSubscription {
            field: "roaming_decision_input.subscriptions",
            sub_id: sub_id.0,
        })
}

fn finish(
    decision: RoamingDecision,
    reason_code: ReasonCodeId,
    checked_sub_id: Option<SubscriptionId>,
) -> RoamingEvaluation {
    debug!(
        decision = decision.as_str(),
        reason_code = reason_code.0,
        "roaming decision"
    );
    RoamingEvaluation {
        decision,
        reason_code,
        checked_sub_id,
    }
}
