#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use netprefs_engines::roaming::{reason_codes, RoamingDecisionRuntime};
use netprefs_kernel_contracts::roaming::{DialogType, SubscriptionId, SubscriptionState};
use netprefs_kernel_contracts::ContractViolation;
use netprefs_settings::roaming::{
    CarrierRoamingConfig, RoamingToggleController, TelephonyBackend, ToggleOutcome,
};
use serde_json::json;

const DDS: SubscriptionId = SubscriptionId(1);
const NDDS: SubscriptionId = SubscriptionId(2);

#[derive(Debug, Clone, serde::Deserialize)]
struct Device {
    default_data_sub_id: SubscriptionId,
    non_default_data_sub_id: SubscriptionId,
    msim_ciwlan_supported: bool,
    roaming: bool,
    subscriptions: Vec<SubscriptionState>,
    #[serde(default)]
    roaming_enabled: Vec<SubscriptionId>,
    #[serde(default)]
    carrier: Option<CarrierRoamingConfig>,
}

#[derive(Debug)]
struct FakeTelephony {
    device: Device,
    states: BTreeMap<SubscriptionId, SubscriptionState>,
    writes: Vec<(SubscriptionId, bool)>,
}

impl FakeTelephony {
    fn from_json(value: serde_json::Value) -> Self {
        let device: Device = serde_json::from_value(value).unwrap();
        let states = device
            .subscriptions
            .iter()
            .map(|s| (s.subscription_id, *s))
            .collect();
        Self {
            device,
            states,
            writes: Vec::new(),
        }
    }
}

impl TelephonyBackend for FakeTelephony {
    fn active_subscription_ids(&self) -> Vec<SubscriptionId> {
        self.states.keys().copied().collect()
    }

    fn subscription_state(&self, sub_id: SubscriptionId) -> Option<SubscriptionState> {
        self.states.get(&sub_id).copied()
    }

    fn default_data_sub_id(&self) -> SubscriptionId {
        self.device.default_data_sub_id
    }

    fn non_default_data_sub_id(&self) -> SubscriptionId {
        self.device.non_default_data_sub_id
    }

    fn is_roaming(&self, _sub_id: SubscriptionId) -> bool {
        self.device.roaming
    }

    fn is_msim_ciwlan_supported(&self) -> bool {
        self.device.msim_ciwlan_supported
    }

    fn data_roaming_enabled(&self, sub_id: SubscriptionId) -> bool {
        self.device.roaming_enabled.contains(&sub_id)
    }

    fn carrier_config(&self, _sub_id: SubscriptionId) -> Option<CarrierRoamingConfig> {
        self.device.carrier
    }

    fn set_data_roaming_enabled(&mut self, sub_id: SubscriptionId, enabled: bool) {
        self.writes.push((sub_id, enabled));
    }
}

fn sub(
    id: i32,
    in_call: bool,
    mode_supported: bool,
    enabled: bool,
    only: bool,
    ims: bool,
) -> serde_json::Value {
    json!({
        "subscription_id": id,
        "in_call": in_call,
        "ciwlan_mode_supported": mode_supported,
        "ciwlan_enabled": enabled,
        "in_ciwlan_only_mode": only,
        "ims_registered_on_ciwlan": ims,
    })
}

fn controller(sub_id: SubscriptionId) -> RoamingToggleController<RoamingDecisionRuntime> {
    RoamingToggleController::new(sub_id, RoamingDecisionRuntime::mvp_v1()).unwrap()
}

#[test]
fn at_roaming_e2e_01_turning_roaming_on_shows_charge_warning_then_applies_on_confirm() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": 2,
        "msim_ciwlan_supported": false,
        "roaming": false,
        "subscriptions": [sub(1, false, false, false, false, false), sub(2, false, false, false, false, false)],
    }));
    let c = controller(DDS);

    let out = c.set_checked(&mut phone, true).unwrap();
    let ToggleOutcome::ConfirmationRequired(req) = out else {
        panic!("expected charge warning");
    };
    assert_eq!(req.dialog_type, DialogType::EnableRoamingChargeWarning);
    assert_eq!(req.reason_code, reason_codes::ROAM_ENABLE_CHARGE_WARNING);
    assert!(phone.writes.is_empty());

    c.confirm(&mut phone, &req).unwrap();
    assert_eq!(phone.writes, vec![(DDS, true)]);
}

#[test]
fn at_roaming_e2e_02_carrier_suppressed_charge_warning_applies_directly() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": -1,
        "msim_ciwlan_supported": false,
        "roaming": false,
        "subscriptions": [sub(1, false, false, false, false, false)],
        "carrier": {"disable_charge_indication_bool": true},
    }));
    let out = controller(DDS).set_checked(&mut phone, true).unwrap();
    assert_eq!(
        out,
        ToggleOutcome::Applied {
            sub_id: DDS,
            enabled: true,
            reason_code: reason_codes::ROAM_NOT_ROAMING,
        }
    );
    assert_eq!(phone.writes, vec![(DDS, true)]);
}

#[test]
fn at_roaming_e2e_03_disabling_dds_roaming_during_ndds_ciwlan_call_warns() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": 2,
        "msim_ciwlan_supported": true,
        "roaming": true,
        "roaming_enabled": [1, 2],
        "subscriptions": [sub(1, false, false, false, false, false), sub(2, true, false, true, false, true)],
    }));
    let out = controller(DDS).set_checked(&mut phone, false).unwrap();
    let ToggleOutcome::ConfirmationRequired(req) = out else {
        panic!("expected call-drop warning");
    };
    assert_eq!(req.dialog_type, DialogType::DisableRoamingDropsCiwlanCall);
    assert!(!req.ciwlan_mode_supported);
    assert!(phone.writes.is_empty());

    controller(DDS).confirm(&mut phone, &req).unwrap();
    assert_eq!(phone.writes, vec![(DDS, false)]);
}

#[test]
fn at_roaming_e2e_04_ndds_controller_applies_without_ciwlan_check() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": 2,
        "msim_ciwlan_supported": true,
        "roaming": true,
        "roaming_enabled": [2],
        "subscriptions": [sub(1, true, true, true, true, true), sub(2, true, true, true, true, true)],
    }));
    let out = controller(NDDS).set_checked(&mut phone, false).unwrap();
    assert_eq!(
        out,
        ToggleOutcome::Applied {
            sub_id: NDDS,
            enabled: false,
            reason_code: reason_codes::ROAM_NOT_DDS_OWNER,
        }
    );
    assert_eq!(phone.writes, vec![(NDDS, false)]);
}

#[test]
fn at_roaming_e2e_05_single_sim_ciwlan_only_call_warns_on_disable() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": -1,
        "msim_ciwlan_supported": false,
        "roaming": true,
        "roaming_enabled": [1],
        "subscriptions": [sub(1, true, true, true, true, true)],
    }));
    let out = controller(DDS).set_checked(&mut phone, false).unwrap();
    assert!(matches!(
        out,
        ToggleOutcome::ConfirmationRequired(r)
            if r.dialog_type == DialogType::DisableRoamingDropsCiwlanCall && r.ciwlan_mode_supported
    ));
}

#[test]
fn at_roaming_e2e_06_dds_missing_from_active_list_fails_fast() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 5,
        "non_default_data_sub_id": -1,
        "msim_ciwlan_supported": false,
        "roaming": true,
        "roaming_enabled": [1],
        "subscriptions": [sub(1, false, false, false, false, false)],
    }));
    let err = controller(DDS).set_checked(&mut phone, false).unwrap_err();
    assert!(matches!(
        err.0,
        ContractViolation::MissingSubscription { sub_id: 5, .. }
    ));
    assert!(phone.writes.is_empty());
}

#[test]
fn at_roaming_e2e_07_same_snapshot_gives_same_outcome() {
    let fixture = json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": 2,
        "msim_ciwlan_supported": true,
        "roaming": true,
        "roaming_enabled": [1],
        "subscriptions": [sub(1, true, false, true, false, true), sub(2, false, false, false, false, false)],
    });
    let c = controller(DDS);
    let first = c
        .set_checked(&mut FakeTelephony::from_json(fixture.clone()), false)
        .unwrap();
    let second = c
        .set_checked(&mut FakeTelephony::from_json(fixture), false)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn at_roaming_e2e_08_force_home_network_from_carrier_bundle() {
    let carrier =
        CarrierRoamingConfig::from_json_str(r#"{"force_home_network_bool": true}"#).unwrap();
    assert_eq!(
        controller(DDS).availability(Some(&carrier)),
        netprefs_settings::roaming::AvailabilityStatus::ConditionallyUnavailable
    );
}

#[test]
fn at_roaming_e2e_09_inactive_ndds_does_not_lock_dds_switch() {
    let mut phone = FakeTelephony::from_json(json!({
        "default_data_sub_id": 1,
        "non_default_data_sub_id": 2,
        "msim_ciwlan_supported": true,
        "roaming": true,
        "roaming_enabled": [1],
        "subscriptions": [sub(1, false, false, false, false, false)],
    }));
    let c = controller(DDS);
    assert!(!c.dds_roaming_locked(&phone));

    let err = c.set_checked(&mut phone, false).unwrap_err();
    assert!(matches!(
        err.0,
        ContractViolation::MissingSubscription { sub_id: 2, .. }
    ));
    assert!(phone.writes.is_empty());
}
