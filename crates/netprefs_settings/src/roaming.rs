#![forbid(unsafe_code)]

use netprefs_engines::roaming::{InvalidInputError, RoamingDecisionRuntime, RoamingEvaluation};
use netprefs_kernel_contracts::roaming::{
    DialogType, RoamingDecision, RoamingDecisionInput, SubscriptionId, SubscriptionSnapshot,
    SubscriptionState,
};
use netprefs_kernel_contracts::{ContractViolation, ReasonCodeId, Validate};
use tracing::{debug, warn};

pub mod reason_codes {
    use netprefs_kernel_contracts::ReasonCodeId;

    // ROAMING settings wiring reason-code namespace.
    pub const ROAM_WIRING_CONFIRMED_BY_USER: ReasonCodeId = ReasonCodeId(0x524D_0101);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvailabilityStatus {
    Available,
    AvailableUnsearchable,
    ConditionallyUnavailable,
}

/// Carrier configuration values the roaming switch reads. Keys follow the carrier config
/// bundle; absent keys keep their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CarrierRoamingConfig {
    #[serde(rename = "force_home_network_bool", alias = "force_home_network")]
    pub force_home_network: bool,
    #[serde(
        rename = "disable_charge_indication_bool",
        alias = "disable_charge_indication"
    )]
    pub disable_charge_indication: bool,
}

impl CarrierRoamingConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Platform collaborator: telephony reads plus the single roaming write.
pub trait TelephonyBackend {
    fn active_subscription_ids(&self) -> Vec<SubscriptionId>;
    /// `None` when `sub_id` is not an active subscription.
    fn subscription_state(&self, sub_id: SubscriptionId) -> Option<SubscriptionState>;
    fn default_data_sub_id(&self) -> SubscriptionId;
    fn non_default_data_sub_id(&self) -> SubscriptionId;
    fn is_roaming(&self, sub_id: SubscriptionId) -> bool;
    fn is_msim_ciwlan_supported(&self) -> bool;
    fn data_roaming_enabled(&self, sub_id: SubscriptionId) -> bool;
    fn carrier_config(&self, sub_id: SubscriptionId) -> Option<CarrierRoamingConfig>;
    fn set_data_roaming_enabled(&mut self, sub_id: SubscriptionId, enabled: bool);
}

pub trait RoamingDecisionEngine {
    fn evaluate(&self, input: &RoamingDecisionInput)
        -> Result<RoamingEvaluation, InvalidInputError>;
}

impl RoamingDecisionEngine for RoamingDecisionRuntime {
    fn evaluate(
        &self,
        input: &RoamingDecisionInput,
    ) -> Result<RoamingEvaluation, InvalidInputError> {
        RoamingDecisionRuntime::evaluate(self, input)
    }
}

/// What the UI must show before the toggle can be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogRequest {
    pub sub_id: SubscriptionId,
    pub dialog_type: DialogType,
    pub ciwlan_mode_supported: bool,
    pub reason_code: ReasonCodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    NotInvokedInvalidSubscription,
    ConfirmationRequired(DialogRequest),
    Applied {
        sub_id: SubscriptionId,
        enabled: bool,
        reason_code: ReasonCodeId,
    },
}

impl ToggleOutcome {
    /// Whether the switch should move to the requested position right away.
    pub fn accepted(&self) -> bool {
        matches!(self, ToggleOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchSummary {
    DdsRoamingUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPresentation {
    pub enabled: bool,
    pub checked: bool,
    pub summary: Option<SwitchSummary>,
}

/// Data roaming switch for one subscription.
#[derive(Debug, Clone)]
pub struct RoamingToggleController<E>
where
    E: RoamingDecisionEngine,
{
    sub_id: SubscriptionId,
    engine: E,
}

impl<E> RoamingToggleController<E>
where
    E: RoamingDecisionEngine,
{
    pub fn new(sub_id: SubscriptionId, engine: E) -> Result<Self, ContractViolation> {
        sub_id.validate()?;
        Ok(Self { sub_id, engine })
    }

    pub fn sub_id(&self) -> SubscriptionId {
        self.sub_id
    }

    pub fn availability(&self, carrier: Option<&CarrierRoamingConfig>) -> AvailabilityStatus {
        if carrier.is_some_and(|c| c.force_home_network) {
            return AvailabilityStatus::ConditionallyUnavailable;
        }
        if self.sub_id.is_valid() {
            AvailabilityStatus::Available
        } else {
            AvailabilityStatus::AvailableUnsearchable
        }
    }

    pub fn is_checked<B: TelephonyBackend>(&self, backend: &B) -> bool {
        self.sub_id.is_valid() && backend.data_roaming_enabled(self.sub_id)
    }

    /// Captures one point-in-time snapshot of every active subscription.
    pub fn build_input<B: TelephonyBackend>(
        &self,
        backend: &B,
        requested_enable: bool,
    ) -> Result<RoamingDecisionInput, ContractViolation> {
        let states = backend
            .active_subscription_ids()
            .into_iter()
            .filter_map(|id| backend.subscription_state(id))
            .collect();
        let subscriptions = SubscriptionSnapshot::v1(states)?;
        let charge_indication_disabled = backend
            .carrier_config(self.sub_id)
            .is_some_and(|c| c.disable_charge_indication);

        RoamingDecisionInput::v1(
            self.sub_id,
            requested_enable,
            self.is_checked(backend),
            backend.is_roaming(self.sub_id),
            backend.default_data_sub_id(),
            backend.non_default_data_sub_id(),
            backend.is_msim_ciwlan_supported(),
            charge_indication_disabled,
            subscriptions,
        )
    }

    pub fn set_checked<B: TelephonyBackend>(
        &self,
        backend: &mut B,
        checked: bool,
    ) -> Result<ToggleOutcome, InvalidInputError> {
        if !self.sub_id.is_valid() {
            warn!(checked, "roaming toggle on an invalid subscription ignored");
            return Ok(ToggleOutcome::NotInvokedInvalidSubscription);
        }

        let input = self.build_input(&*backend, checked)?;
        let evaluation = self.engine.evaluate(&input)?;
        match evaluation.decision {
            RoamingDecision::RequireConfirmation { dialog_type } => {
                let ciwlan_mode_supported = input
                    .subscriptions
                    .get(self.sub_id)
                    .is_some_and(|s| s.ciwlan_mode_supported);
                debug!(
                    sub_id = %self.sub_id,
                    dialog_type = dialog_type.as_str(),
                    "roaming change needs confirmation"
                );
                Ok(ToggleOutcome::ConfirmationRequired(DialogRequest {
                    sub_id: self.sub_id,
                    dialog_type,
                    ciwlan_mode_supported,
                    reason_code: evaluation.reason_code,
                }))
            }
            RoamingDecision::ApplyDirectly | RoamingDecision::NotApplicable => {
                backend.set_data_roaming_enabled(self.sub_id, checked);
                Ok(ToggleOutcome::Applied {
                    sub_id: self.sub_id,
                    enabled: checked,
                    reason_code: evaluation.reason_code,
                })
            }
        }
    }

    /// Applies the value a dialog asked about once the user accepts it.
    pub fn confirm<B: TelephonyBackend>(
        &self,
        backend: &mut B,
        request: &DialogRequest,
    ) -> Result<ToggleOutcome, ContractViolation> {
        if request.sub_id != self.sub_id || !self.sub_id.is_valid() {
            return Err(ContractViolation::InvalidValue {
                field: "dialog_request.sub_id",
                reason: "must match the controller subscription",
            });
        }
        let enabled = request.dialog_type.confirmed_roaming_value();
        backend.set_data_roaming_enabled(self.sub_id, enabled);
        Ok(ToggleOutcome::Applied {
            sub_id: self.sub_id,
            enabled,
            reason_code: reason_codes::ROAM_WIRING_CONFIRMED_BY_USER,
        })
    }

    /// Switch state to render. `None` leaves an admin-restricted switch untouched.
    pub fn presentation<B: TelephonyBackend>(
        &self,
        backend: &B,
        disabled_by_admin: bool,
    ) -> Option<SwitchPresentation> {
        if disabled_by_admin {
            return None;
        }
        let checked = self.is_checked(backend);
        if checked && self.dds_roaming_locked(backend) {
            debug!(sub_id = %self.sub_id, "nDDS voice call ongoing, DDS roaming locked on");
            return Some(SwitchPresentation {
                enabled: false,
                checked,
                summary: Some(SwitchSummary::DdsRoamingUnavailable),
            });
        }
        Some(SwitchPresentation {
            enabled: self.sub_id.is_valid(),
            checked,
            summary: None,
        })
    }

    /// True while this controller owns the DDS and the nDDS has a voice call.
    pub fn dds_roaming_locked<B: TelephonyBackend>(&self, backend: &B) -> bool {
        if !self.sub_id.is_valid() || self.sub_id != backend.default_data_sub_id() {
            return false;
        }
        let ndds = backend.non_default_data_sub_id();
        ndds.is_valid()
            && ndds != self.sub_id
            && backend
                .subscription_state(ndds)
                .is_some_and(|state| state.in_call)
    }

    pub fn handles_roaming_change(&self, sub_id: SubscriptionId, enabled: bool) -> bool {
        if sub_id != self.sub_id {
            debug!(
                %sub_id,
                enabled,
                own_sub_id = %self.sub_id,
                "roaming change for another subscription"
            );
            return false;
        }
        true
    }
}
