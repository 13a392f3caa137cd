//! Module name to runner lookup.

use crate::{
    ise_radius_integration::IseRadiusIntegration, network_compliance::NetworkCompliance, rma::Rma,
    sda_fabric_virtual_networks::FabricVirtualNetworks,
};
use ccc_orch_common::{ModuleRunner, WorkflowRunner};
use ccc_playbook_gen::catalog::generators;

/// Every module the binary can run, workflows first.
pub fn modules() -> Vec<Box<dyn ModuleRunner>> {
    let mut modules: Vec<Box<dyn ModuleRunner>> = vec![
        Box::new(WorkflowRunner::new(IseRadiusIntegration::new())),
        Box::new(WorkflowRunner::new(NetworkCompliance::new())),
        Box::new(WorkflowRunner::new(Rma::new())),
        Box::new(WorkflowRunner::new(FabricVirtualNetworks::new())),
    ];
    modules.extend(
        generators()
            .into_iter()
            .map(|g| Box::new(WorkflowRunner::new(g)) as Box<dyn ModuleRunner>),
    );
    modules
}

pub fn find(name: &str) -> Option<Box<dyn ModuleRunner>> {
    modules().into_iter().find(|m| m.descriptor().name == name)
}

pub fn names() -> Vec<&'static str> {
    modules().iter().map(|m| m.descriptor().name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names = names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_find() {
        assert!(find("rma").is_some());
        assert!(find("sda_fabric_virtual_networks_playbook_generator").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_every_schema_is_well_formed() {
        for module in modules() {
            let desc = module.descriptor();
            assert!(desc.schema.check().is_ok(), "{}", desc.name);
        }
    }
}
