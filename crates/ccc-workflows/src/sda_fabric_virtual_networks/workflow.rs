//! Merge and delete of layer 3 virtual networks and anycast gateways.

use super::types::*;
use async_trait::async_trait;
use ccc_orch_common::{
    changed_fields, drop_nulls, ArgSpec, FabricType, FieldSpec, Format, ModuleDescriptor, OrchError, OrchResult,
    PredicateTable, RunContext, State, Workflow,
};
use ccc_types::{CccVersion, VlanId};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

pub const MODULE_NAME: &str = "sda_fabric_virtual_networks";

fn location_spec() -> ArgSpec {
    ArgSpec::new()
        .field(
            "site_name_hierarchy",
            FieldSpec::str().required().format(Format::SiteHierarchy),
        )
        .field(
            "fabric_type",
            FieldSpec::str()
                .choices(["fabric_site", "fabric_zone"])
                .default("fabric_site"),
        )
}

/// Schema of one config block.
pub fn schema() -> ArgSpec {
    let virtual_network = ArgSpec::new()
        .field("vn_name", FieldSpec::str().required())
        .field("fabric_site_locations", FieldSpec::list_of(location_spec()))
        .field("anchored_site_name", FieldSpec::str().format(Format::SiteHierarchy));

    let anycast_gateway = ArgSpec::new()
        .field("vn_name", FieldSpec::str().required())
        .field("fabric_site_location", FieldSpec::dict(location_spec()).required())
        .field("ip_pool_name", FieldSpec::str().required())
        .field("tcp_mss_adjustment", FieldSpec::int().range(500, 1440))
        .field("traffic_type", FieldSpec::str().choices(["DATA", "VOICE"]))
        .field("pool_type", FieldSpec::str().choices(["EXTENDED_NODE", "FABRIC_AP"]))
        .field("vlan_name", FieldSpec::str().length_max(32))
        .field("vlan_id", FieldSpec::int().range(2, 4093))
        .field("security_group_name", FieldSpec::str())
        .field("auto_generate_vlan_name", FieldSpec::bool())
        .field("is_critical_pool", FieldSpec::bool())
        .field("is_layer_2_flooding_enabled", FieldSpec::bool())
        .field("is_wireless_pool", FieldSpec::bool())
        .field("is_ip_directed_broadcast", FieldSpec::bool())
        .field("is_intra_subnet_routing_enabled", FieldSpec::bool())
        .field("is_multiple_ip_to_mac_addresses", FieldSpec::bool())
        .field("is_supplicant_based_extended_node_onboarding", FieldSpec::bool())
        .field("is_group_based_policy_enforcement_enabled", FieldSpec::bool());

    ArgSpec::new()
        .field("virtual_networks", FieldSpec::list_of(virtual_network))
        .field("anycast_gateways", FieldSpec::list_of(anycast_gateway))
}

/// Fabric virtual networks workflow.
pub struct FabricVirtualNetworks {
    desc: ModuleDescriptor,
    predicates: PredicateTable,
}

impl FabricVirtualNetworks {
    pub fn new() -> Self {
        Self {
            desc: ModuleDescriptor::new(
                MODULE_NAME,
                vec![State::Merged, State::Deleted],
                schema(),
                CccVersion::new(vec![2, 3, 7, 6]),
            ),
            predicates: PredicateTable::new(),
        }
    }

    async fn fetch_virtual_network(&self, ctx: &RunContext, name: &str) -> OrchResult<Option<VirtualNetworkRecord>> {
        let items = ctx
            .paginate("sda", "get_layer3_virtual_networks", &json!({ "virtualNetworkName": name }))
            .await?;
        let records: Vec<VirtualNetworkRecord> = ctx.decode_items(&items, "layer3 virtual network")?;
        Ok(records.into_iter().find(|r| r.virtual_network_name == name))
    }

    async fn fetch_gateway(&self, ctx: &RunContext, want: &AnycastGatewayWant) -> OrchResult<Option<AnycastGatewayRecord>> {
        let items = ctx
            .paginate(
                "sda",
                "get_anycast_gateways",
                &json!({
                    "fabricId": want.location.fabric_id,
                    "virtualNetworkName": want.vn_name,
                    "ipPoolName": want.ip_pool_name,
                }),
            )
            .await?;
        let records: Vec<AnycastGatewayRecord> = ctx.decode_items(&items, "anycast gateway")?;
        Ok(records.into_iter().find(|r| {
            r.attributes.get("fabricId") == Some(&json!(want.location.fabric_id))
                && r.attributes.get("virtualNetworkName") == Some(&json!(want.vn_name))
                && r.attributes.get("ipPoolName") == Some(&json!(want.ip_pool_name))
        }))
    }

    /// Rejects the block before any change if a gateway cannot be merged.
    fn check_gateways(&self, want: &FabricVnWant, have: &FabricVnHave) -> OrchResult<()> {
        let mut problems = Vec::new();
        for (gw, current) in want.anycast_gateways.iter().zip(&have.anycast_gateways) {
            match current {
                Some(record) => {
                    for field in changed_fields(&record.to_value(), &gw.entry, GATEWAY_IMMUTABLE_FIELDS) {
                        problems.push(format!(
                            "anycast_gateways[{}].{}: cannot be changed on the existing anycast gateway {}",
                            gw.index,
                            field,
                            gw.label()
                        ));
                    }
                }
                None => {
                    let auto_name = gw
                        .entry
                        .get("auto_generate_vlan_name")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    if !auto_name && gw.entry.get("vlan_name").is_none() {
                        problems.push(format!(
                            "anycast_gateways[{}].vlan_name: required unless auto_generate_vlan_name is true",
                            gw.index
                        ));
                    }
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(OrchError::invalid_input(problems.join("; ")))
        }
    }

    async fn merge_virtual_networks(
        &self,
        ctx: &mut RunContext,
        want: &FabricVnWant,
        have: &FabricVnHave,
    ) -> OrchResult<ChangeSummary> {
        let mut summary = ChangeSummary::default();
        let mut creates = Vec::new();
        let mut updates = Vec::new();

        for (vn, current) in want.virtual_networks.iter().zip(&have.virtual_networks) {
            let Some(record) = current else {
                creates.push(drop_nulls(&json!({
                    "virtualNetworkName": vn.name,
                    "fabricIds": vn.fabric_ids(),
                    "anchoredSiteId": vn.anchored_fabric_id,
                })));
                summary.created.push(vn.name.clone());
                continue;
            };

            let missing: Vec<String> = vn
                .fabric_ids()
                .into_iter()
                .filter(|id| !record.fabric_ids().contains(id))
                .collect();
            let anchor_differs =
                vn.anchored_fabric_id.is_some() && vn.anchored_fabric_id != record.anchored_site_id;
            if missing.is_empty() && !anchor_differs {
                summary.unchanged.push(vn.name.clone());
                continue;
            }

            let mut fabric_ids = record.fabric_ids().to_vec();
            fabric_ids.extend(missing);
            updates.push(drop_nulls(&json!({
                "id": record.id,
                "virtualNetworkName": record.virtual_network_name,
                "fabricIds": fabric_ids,
                "anchoredSiteId": vn.anchored_fabric_id.clone().or_else(|| record.anchored_site_id.clone()),
            })));
            summary.updated.push(vn.name.clone());
        }

        if !creates.is_empty() {
            info!(count = creates.len(), "Adding layer 3 virtual networks");
            ctx.run_task(
                "sda",
                "add_layer3_virtual_networks",
                &json!({ "payload": creates }),
                &self.predicates,
                "Failed to add layer 3 virtual networks",
            )
            .await?;
        }
        if !updates.is_empty() {
            info!(count = updates.len(), "Updating layer 3 virtual networks");
            ctx.run_task(
                "sda",
                "update_layer3_virtual_networks",
                &json!({ "payload": updates }),
                &self.predicates,
                "Failed to update layer 3 virtual networks",
            )
            .await?;
        }
        Ok(summary)
    }

    async fn merge_gateways(
        &self,
        ctx: &mut RunContext,
        want: &FabricVnWant,
        have: &FabricVnHave,
    ) -> OrchResult<ChangeSummary> {
        let mut summary = ChangeSummary::default();
        let mut creates = Vec::new();
        let mut updates = Vec::new();

        for (gw, current) in want.anycast_gateways.iter().zip(&have.anycast_gateways) {
            match current {
                None => {
                    creates.push(gateway_payload(gw));
                    summary.created.push(gw.label());
                }
                Some(record) => {
                    let mut payload = record.to_value();
                    let changed = changed_fields(&payload, &gw.entry, GATEWAY_MUTABLE_FIELDS);
                    if changed.is_empty() {
                        summary.unchanged.push(gw.label());
                        continue;
                    }
                    info!(gateway = %gw.label(), fields = ?changed, "Anycast gateway differs");
                    if let Value::Object(obj) = &mut payload {
                        copy_fields(&gw.entry, obj, GATEWAY_MUTABLE_FIELDS);
                    }
                    updates.push(drop_nulls(&payload));
                    summary.updated.push(gw.label());
                }
            }
        }

        if !creates.is_empty() {
            ctx.run_task(
                "sda",
                "add_anycast_gateways",
                &json!({ "payload": creates }),
                &self.predicates,
                "Failed to add anycast gateways",
            )
            .await?;
        }
        if !updates.is_empty() {
            ctx.run_task(
                "sda",
                "update_anycast_gateways",
                &json!({ "payload": updates }),
                &self.predicates,
                "Failed to update anycast gateways",
            )
            .await?;
        }
        Ok(summary)
    }
}

impl Default for FabricVirtualNetworks {
    fn default() -> Self {
        Self::new()
    }
}

fn entries<'a>(block: &'a Value, key: &str) -> &'a [Value] {
    block.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
}

fn text(entry: &Value, key: &str) -> String {
    entry.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Copies the non-null playbook fields of `entry` onto a controller object.
fn copy_fields(entry: &Value, obj: &mut Map<String, Value>, fields: &[(&str, &str)]) {
    for (ccc_key, playbook_key) in fields {
        if let Some(value) = entry.get(*playbook_key).filter(|v| !v.is_null()) {
            obj.insert(ccc_key.to_string(), value.clone());
        }
    }
}

fn gateway_payload(gw: &AnycastGatewayWant) -> Value {
    let mut obj = Map::new();
    obj.insert("fabricId".to_string(), json!(gw.location.fabric_id));
    obj.insert("virtualNetworkName".to_string(), json!(gw.vn_name));
    obj.insert("ipPoolName".to_string(), json!(gw.ip_pool_name));
    copy_fields(&gw.entry, &mut obj, GATEWAY_IMMUTABLE_FIELDS);
    copy_fields(&gw.entry, &mut obj, GATEWAY_MUTABLE_FIELDS);
    obj.entry("trafficType").or_insert_with(|| json!("DATA"));
    Value::Object(obj)
}

/// Resolves a playbook location to the fabric built on that site.
async fn resolve_location(ctx: &mut RunContext, location: &Value, path: &str) -> OrchResult<FabricLocation> {
    let name = text(location, "site_name_hierarchy");
    let wanted = match location.get("fabric_type").and_then(Value::as_str) {
        Some("fabric_zone") => FabricType::FabricZone,
        _ => FabricType::FabricSite,
    };
    let fabric = resolve_fabric(ctx, &name, path).await?;
    if fabric.1 != wanted {
        return Err(OrchError::invalid_input(format!(
            "{}: site '{}' is a {}, not a {}",
            path,
            name,
            fabric.1.as_str(),
            wanted.as_str()
        )));
    }
    Ok(FabricLocation {
        site_name_hierarchy: name,
        fabric_type: wanted,
        fabric_id: fabric.0,
    })
}

async fn resolve_fabric(ctx: &mut RunContext, site_name: &str, path: &str) -> OrchResult<(String, FabricType)> {
    let site = ctx.site_by_name(site_name).await?.ok_or_else(|| {
        OrchError::precondition(format!("{}: site '{}' does not exist in Catalyst Center", path, site_name))
    })?;
    let fabric = ctx.fabric_for_site(&site.id).await?.ok_or_else(|| {
        OrchError::precondition(format!(
            "{}: site '{}' is neither a fabric site nor a fabric zone",
            path, site_name
        ))
    })?;
    Ok((fabric.id, fabric.fabric_type))
}

#[async_trait]
impl Workflow for FabricVirtualNetworks {
    type Want = FabricVnWant;
    type Have = FabricVnHave;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, ctx: &mut RunContext, block: &Value, _state: State) -> OrchResult<FabricVnWant> {
        let mut want = FabricVnWant::default();

        for (index, entry) in entries(block, "virtual_networks").iter().enumerate() {
            let path = format!("virtual_networks[{}]", index);
            let mut locations = Vec::new();
            for (i, location) in entries(entry, "fabric_site_locations").iter().enumerate() {
                let loc_path = format!("{}.fabric_site_locations[{}]", path, i);
                locations.push(resolve_location(ctx, location, &loc_path).await?);
            }
            let anchored_fabric_id = match entry.get("anchored_site_name").and_then(Value::as_str) {
                Some(site) => Some(resolve_fabric(ctx, site, &format!("{}.anchored_site_name", path)).await?.0),
                None => None,
            };
            want.virtual_networks.push(VirtualNetworkWant {
                index,
                name: text(entry, "vn_name"),
                locations,
                anchored_fabric_id,
            });
        }

        for (index, entry) in entries(block, "anycast_gateways").iter().enumerate() {
            let path = format!("anycast_gateways[{}]", index);
            if let Some(vlan) = entry.get("vlan_id").and_then(Value::as_u64) {
                u16::try_from(vlan)
                    .ok()
                    .and_then(|v| VlanId::new(v).ok())
                    .ok_or_else(|| {
                        OrchError::invalid_input(format!("{}.vlan_id: VLAN {} is reserved or out of range", path, vlan))
                    })?;
            }
            let location = match entry.get("fabric_site_location") {
                Some(location) => {
                    resolve_location(ctx, location, &format!("{}.fabric_site_location", path)).await?
                }
                None => {
                    return Err(OrchError::invalid_input(format!(
                        "{}.fabric_site_location: missing required parameter",
                        path
                    )))
                }
            };
            want.anycast_gateways.push(AnycastGatewayWant {
                index,
                location,
                vn_name: text(entry, "vn_name"),
                ip_pool_name: text(entry, "ip_pool_name"),
                entry: entry.clone(),
            });
        }

        info!(
            virtual_networks = want.virtual_networks.len(),
            anycast_gateways = want.anycast_gateways.len(),
            "Desired fabric virtual networks resolved"
        );
        Ok(want)
    }

    async fn get_have(&self, ctx: &mut RunContext, want: &FabricVnWant, _state: State) -> OrchResult<FabricVnHave> {
        let mut have = FabricVnHave::default();
        for vn in &want.virtual_networks {
            have.virtual_networks.push(self.fetch_virtual_network(ctx, &vn.name).await?);
        }
        for gw in &want.anycast_gateways {
            have.anycast_gateways.push(self.fetch_gateway(ctx, gw).await?);
        }
        Ok(have)
    }

    #[instrument(skip_all)]
    async fn get_diff_merged(&self, ctx: &mut RunContext, want: &FabricVnWant, have: &FabricVnHave) -> OrchResult<()> {
        self.check_gateways(want, have)?;
        let virtual_networks = self.merge_virtual_networks(ctx, want, have).await?;
        let anycast_gateways = self.merge_gateways(ctx, want, have).await?;
        ctx.result.push_response(json!({
            "virtual_networks": virtual_networks,
            "anycast_gateways": anycast_gateways,
        }));
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_diff_deleted(&self, ctx: &mut RunContext, want: &FabricVnWant, have: &FabricVnHave) -> OrchResult<()> {
        let mut gateways = ChangeSummary::default();
        for (gw, current) in want.anycast_gateways.iter().zip(&have.anycast_gateways) {
            let Some(record) = current else {
                gateways.unchanged.push(gw.label());
                continue;
            };
            ctx.run_task(
                "sda",
                "delete_anycast_gateway_by_id",
                &json!({ "id": record.id }),
                &self.predicates,
                "Failed to delete anycast gateway",
            )
            .await?;
            gateways.deleted.push(gw.label());
        }

        let mut networks = ChangeSummary::default();
        for (vn, current) in want.virtual_networks.iter().zip(&have.virtual_networks) {
            let Some(record) = current else {
                networks.unchanged.push(vn.name.clone());
                continue;
            };

            if vn.locations.is_empty() {
                ctx.run_task(
                    "sda",
                    "delete_layer3_virtual_networks",
                    &json!({ "virtualNetworkName": record.virtual_network_name }),
                    &self.predicates,
                    "Failed to delete layer 3 virtual network",
                )
                .await?;
                networks.deleted.push(vn.name.clone());
                continue;
            }

            let removed = vn.fabric_ids();
            let remaining: Vec<String> = record
                .fabric_ids()
                .iter()
                .filter(|id| !removed.contains(id))
                .cloned()
                .collect();
            if remaining.len() == record.fabric_ids().len() {
                networks.unchanged.push(vn.name.clone());
                continue;
            }
            ctx.run_task(
                "sda",
                "update_layer3_virtual_networks",
                &json!({
                    "payload": [drop_nulls(&json!({
                        "id": record.id,
                        "virtualNetworkName": record.virtual_network_name,
                        "fabricIds": remaining,
                        "anchoredSiteId": record.anchored_site_id,
                    }))]
                }),
                &self.predicates,
                "Failed to remove fabric sites from layer 3 virtual network",
            )
            .await?;
            networks.updated.push(vn.name.clone());
        }

        ctx.result.push_response(json!({
            "virtual_networks": networks,
            "anycast_gateways": gateways,
        }));
        Ok(())
    }

    async fn verify_diff_merged(&self, _ctx: &mut RunContext, want: &FabricVnWant, have: &FabricVnHave) -> OrchResult<()> {
        let mut problems = Vec::new();
        for (vn, current) in want.virtual_networks.iter().zip(&have.virtual_networks) {
            match current {
                None => problems.push(format!("virtual network '{}' is absent", vn.name)),
                Some(record) => {
                    if vn.fabric_ids().iter().any(|id| !record.fabric_ids().contains(id)) {
                        problems.push(format!("virtual network '{}' is missing fabric sites", vn.name));
                    }
                    if vn.anchored_fabric_id.is_some() && vn.anchored_fabric_id != record.anchored_site_id {
                        problems.push(format!("virtual network '{}' has a different anchor", vn.name));
                    }
                }
            }
        }
        for (gw, current) in want.anycast_gateways.iter().zip(&have.anycast_gateways) {
            match current {
                None => problems.push(format!("anycast gateway {} is absent", gw.label())),
                Some(record) => {
                    let fields: Vec<(&str, &str)> = GATEWAY_IMMUTABLE_FIELDS
                        .iter()
                        .chain(GATEWAY_MUTABLE_FIELDS)
                        .copied()
                        .collect();
                    let differing = changed_fields(&record.to_value(), &gw.entry, &fields);
                    if !differing.is_empty() {
                        problems.push(format!("anycast gateway {} differs in {}", gw.label(), differing.join(", ")));
                    }
                }
            }
        }
        if problems.is_empty() {
            info!("Merged fabric virtual networks verified");
            Ok(())
        } else {
            Err(OrchError::verification(problems.join("; ")))
        }
    }

    async fn verify_diff_deleted(&self, _ctx: &mut RunContext, want: &FabricVnWant, have: &FabricVnHave) -> OrchResult<()> {
        let mut problems = Vec::new();
        for (gw, current) in want.anycast_gateways.iter().zip(&have.anycast_gateways) {
            if current.is_some() {
                problems.push(format!("anycast gateway {} still exists", gw.label()));
            }
        }
        for (vn, current) in want.virtual_networks.iter().zip(&have.virtual_networks) {
            match current {
                Some(_) if vn.locations.is_empty() => {
                    problems.push(format!("virtual network '{}' still exists", vn.name))
                }
                Some(record) if vn.fabric_ids().iter().any(|id| record.fabric_ids().contains(id)) => {
                    problems.push(format!("virtual network '{}' is still on a removed fabric site", vn.name))
                }
                _ => {}
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(OrchError::verification(problems.join("; ")))
        }
    }
}
