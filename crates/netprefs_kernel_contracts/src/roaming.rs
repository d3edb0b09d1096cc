#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::{ContractViolation, SchemaVersion, Validate};

pub const ROAMING_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Upper bound on active subscriptions accepted in one snapshot.
pub const MAX_SNAPSHOT_SUBSCRIPTIONS: usize = 16;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct SubscriptionId(pub i32);

impl SubscriptionId {
    pub const INVALID: SubscriptionId = SubscriptionId(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Validate for SubscriptionId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 < Self::INVALID.0 {
            return Err(ContractViolation::InvalidValue {
                field: "subscription_id",
                reason: "must be >= -1",
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Call and C_IWLAN state of one active subscription, captured at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubscriptionState {
    pub subscription_id: SubscriptionId,
    pub in_call: bool,
    pub ciwlan_mode_supported: bool,
    pub ciwlan_enabled: bool,
    pub in_ciwlan_only_mode: bool,
    pub ims_registered_on_ciwlan: bool,
}

impl SubscriptionState {
    pub fn v1(
        subscription_id: SubscriptionId,
        in_call: bool,
        ciwlan_mode_supported: bool,
        ciwlan_enabled: bool,
        in_ciwlan_only_mode: bool,
        ims_registered_on_ciwlan: bool,
    ) -> Result<Self, ContractViolation> {
        let state = Self {
            subscription_id,
            in_call,
            ciwlan_mode_supported,
            ciwlan_enabled,
            in_ciwlan_only_mode,
            ims_registered_on_ciwlan,
        };
        state.validate()?;
        Ok(state)
    }

    /// Idle subscription with C_IWLAN off.
    pub fn idle(subscription_id: SubscriptionId) -> Result<Self, ContractViolation> {
        Self::v1(subscription_id, false, false, false, false, false)
    }

    /// True when this subscription has a voice call carried over C_IWLAN that would drop
    /// if data roaming were switched off while roaming.
    pub fn ciwlan_call_at_risk(&self) -> bool {
        self.in_call
            && self.ciwlan_enabled
            && (self.in_ciwlan_only_mode || !self.ciwlan_mode_supported)
            && self.ims_registered_on_ciwlan
    }
}

impl Validate for SubscriptionState {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.subscription_id.validate()?;
        if !self.subscription_id.is_valid() {
            return Err(ContractViolation::InvalidValue {
                field: "subscription_state.subscription_id",
                reason: "must be a valid subscription id",
            });
        }
        Ok(())
    }
}

/// Immutable view of every active subscription, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(
    try_from = "Vec<SubscriptionState>",
    into = "Vec<SubscriptionState>"
)]
pub struct SubscriptionSnapshot {
    states: BTreeMap<SubscriptionId, SubscriptionState>,
}

impl SubscriptionSnapshot {
    pub fn v1(states: Vec<SubscriptionState>) -> Result<Self, ContractViolation> {
        if states.len() > MAX_SNAPSHOT_SUBSCRIPTIONS {
            return Err(ContractViolation::InvalidValue {
                field: "subscription_snapshot.states",
                reason: "exceeds MAX_SNAPSHOT_SUBSCRIPTIONS",
            });
        }
        let mut map = BTreeMap::new();
        for state in states {
            state.validate()?;
            if map.insert(state.subscription_id, state).is_some() {
                return Err(ContractViolation::InvalidValue {
                    field: "subscription_snapshot.states",
                    reason: "subscription ids must be unique",
                });
            }
        }
        Ok(Self { states: map })
    }

    pub fn get(&self, sub_id: SubscriptionId) -> Option<&SubscriptionState> {
        self.states.get(&sub_id)
    }

    pub fn contains(&self, sub_id: SubscriptionId) -> bool {
        self.states.contains_key(&sub_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscriptionState> {
        self.states.values()
    }
}

impl Validate for SubscriptionSnapshot {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.states.len() > MAX_SNAPSHOT_SUBSCRIPTIONS {
            return Err(ContractViolation::InvalidValue {
                field: "subscription_snapshot.states",
                reason: "exceeds MAX_SNAPSHOT_SUBSCRIPTIONS",
            });
        }
        for (key, state) in &self.states {
            state.validate()?;
            if *key != state.subscription_id {
                return Err(ContractViolation::InvalidValue {
                    field: "subscription_snapshot.states",
                    reason: "key must match subscription_id",
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<SubscriptionState>> for SubscriptionSnapshot {
    type Error = ContractViolation;

    fn try_from(states: Vec<SubscriptionState>) -> Result<Self, Self::Error> {
        Self::v1(states)
    }
}

impl From<SubscriptionSnapshot> for Vec<SubscriptionState> {
    fn from(snapshot: SubscriptionSnapshot) -> Self {
        snapshot.states.into_values().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DialogType {
    EnableRoamingChargeWarning,
    DisableRoamingDropsCiwlanCall,
}

impl DialogType {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogType::EnableRoamingChargeWarning => "ENABLE_ROAMING_CHARGE_WARNING",
            DialogType::DisableRoamingDropsCiwlanCall => "DISABLE_ROAMING_DROPS_CIWLAN_CALL",
        }
    }

    /// Roaming value to write once the user accepts the dialog.
    pub fn confirmed_roaming_value(self) -> bool {
        match self {
            DialogType::EnableRoamingChargeWarning => true,
            DialogType::DisableRoamingDropsCiwlanCall => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoamingDecision {
    ApplyDirectly,
    RequireConfirmation { dialog_type: DialogType },
    NotApplicable,
}

impl RoamingDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            RoamingDecision::ApplyDirectly => "APPLY_DIRECTLY",
            RoamingDecision::RequireConfirmation { .. } => "REQUIRE_CONFIRMATION",
            RoamingDecision::NotApplicable => "NOT_APPLICABLE",
        }
    }

    pub fn dialog_type(self) -> Option<DialogType> {
        match self {
            RoamingDecision::RequireConfirmation { dialog_type } => Some(dialog_type),
            RoamingDecision::ApplyDirectly | RoamingDecision::NotApplicable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoamingDecisionInput {
    pub schema_version: SchemaVersion,
    pub target_sub_id: SubscriptionId,
    pub requested_enable: bool,
    pub current_roaming_enabled: bool,
    pub is_roaming_now: bool,
    pub default_data_sub_id: SubscriptionId,
    pub non_default_data_sub_id: SubscriptionId,
    pub multi_sim_ciwlan_supported: bool,
    pub charge_indication_disabled: bool,
    pub subscriptions: SubscriptionSnapshot,
}

impl RoamingDecisionInput {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        target_sub_id: SubscriptionId,
        requested_enable: bool,
        current_roaming_enabled: bool,
        is_roaming_now: bool,
        default_data_sub_id: SubscriptionId,
        non_default_data_sub_id: SubscriptionId,
        multi_sim_ciwlan_supported: bool,
        charge_indication_disabled: bool,
        subscriptions: SubscriptionSnapshot,
    ) -> Result<Self, ContractViolation> {
        let input = Self {
            schema_version: ROAMING_CONTRACT_VERSION,
            target_sub_id,
            requested_enable,
            current_roaming_enabled,
            is_roaming_now,
            default_data_sub_id,
            non_default_data_sub_id,
            multi_sim_ciwlan_supported,
            charge_indication_disabled,
            subscriptions,
        };
        input.validate()?;
        Ok(input)
    }
}

impl Validate for RoamingDecisionInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ROAMING_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "roaming_decision_input.schema_version",
                reason: "must match ROAMING_CONTRACT_VERSION",
            });
        }
        self.subscriptions.validate()?;
        require_entry(
            "roaming_decision_input.target_sub_id",
            self.target_sub_id,
            &self.subscriptions,
        )?;
        require_entry(
            "roaming_decision_input.default_data_sub_id",
            self.default_data_sub_id,
            &self.subscriptions,
        )?;
        require_entry(
            "roaming_decision_input.non_default_data_sub_id",
            self.non_default_data_sub_id,
            &self.subscriptions,
        )?;
        Ok(())
    }
}

// The invalid id is never looked up, so it never needs an entry.
fn require_entry(
    field: &'static str,
    sub_id: SubscriptionId,
    snapshot: &SubscriptionSnapshot,
) -> Result<(), ContractViolation> {
    sub_id.validate()?;
    if sub_id.is_valid() && !snapshot.contains(sub_id) {
        return Err(ContractViolation::MissingSubscription {
            field,
            sub_id: sub_id.0,
        });
    }
    Ok(())
}
