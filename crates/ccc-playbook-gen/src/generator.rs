//! The generator workflow: fetch, filter, transform, emit.

use crate::component::Component;
use crate::emit::{default_file_name, write_playbook};
use crate::filters::{request_spec, GenerationRequest};
use crate::resolve::ResolutionTable;
use async_trait::async_trait;
use ccc_orch_common::{
    ArgSpec, FieldSpec, ModuleDescriptor, OrchError, OrchResult, RunContext, State, Workflow,
};
use ccc_types::CccVersion;
use chrono::Local;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{info, instrument};

/// The components one generator module can render, plus its global filters.
pub struct Catalog {
    module: &'static str,
    min_version: CccVersion,
    global_spec: ArgSpec,
    components: Vec<Box<dyn Component>>,
}

impl Catalog {
    pub fn new(module: &'static str, min_version: CccVersion) -> Self {
        Self {
            module,
            min_version,
            global_spec: ArgSpec::new(),
            components: Vec::new(),
        }
    }

    pub fn global_filter(mut self, name: &str, spec: FieldSpec) -> Self {
        self.global_spec = self.global_spec.field(name, spec);
        self
    }

    pub fn component(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn global_spec(&self) -> &ArgSpec {
        &self.global_spec
    }

    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components.iter().find(|c| c.name() == name).map(|c| c.as_ref())
    }
}

/// Rendered playbook entries for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedComponent {
    pub name: &'static str,
    pub entries: Vec<Value>,
}

/// `config: [ {component: [entries]}, ... ]`, skipping empty components.
pub fn playbook_document(components: &[RenderedComponent]) -> Value {
    let config: Vec<Value> = components
        .iter()
        .filter(|c| !c.entries.is_empty())
        .map(|c| json!({ c.name: c.entries }))
        .collect();
    json!({ "config": config })
}

/// Renders the current controller configuration of one domain as a
/// playbook that its workflow module accepts under `merged`.
///
/// Writing the file does not change the controller, so a run never
/// reports `changed`.
pub struct PlaybookGenerator {
    desc: ModuleDescriptor,
    catalog: Catalog,
}

impl PlaybookGenerator {
    pub fn new(catalog: Catalog) -> Self {
        let desc = ModuleDescriptor::new(
            catalog.module(),
            vec![State::Merged],
            request_spec(&catalog),
            catalog.min_version.clone(),
        );
        Self { desc, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    async fn render(
        &self,
        ctx: &RunContext,
        table: &ResolutionTable,
        name: &'static str,
        filters: &[Value],
        global: &Value,
    ) -> OrchResult<RenderedComponent> {
        let component = self
            .catalog
            .get(name)
            .ok_or_else(|| OrchError::internal(format!("component '{}' is not in the catalog", name)))?;
        let raw = component.fetch(ctx, filters).await?;
        let kept: Vec<Value> = raw
            .iter()
            .filter(|item| component.matches_global(item, global, table))
            .cloned()
            .collect();
        let entries = component.temp_spec().apply_all(&kept, table);
        info!(
            component = name,
            fetched = raw.len(),
            kept = kept.len(),
            rendered = entries.len(),
            "Component rendered"
        );
        Ok(RenderedComponent { name, entries })
    }
}

#[async_trait]
impl Workflow for PlaybookGenerator {
    type Want = GenerationRequest;
    type Have = Vec<RenderedComponent>;

    fn descriptor(&self) -> &ModuleDescriptor {
        &self.desc
    }

    async fn get_want(&self, _ctx: &mut RunContext, block: &Value, _state: State) -> OrchResult<GenerationRequest> {
        let request = GenerationRequest::from_block(block, &self.catalog)?;
        info!(components = ?request.component_names(), "Generation requested");
        Ok(request)
    }

    #[instrument(skip_all, fields(module = self.catalog.module()))]
    async fn get_have(
        &self,
        ctx: &mut RunContext,
        want: &GenerationRequest,
        _state: State,
    ) -> OrchResult<Vec<RenderedComponent>> {
        let table = ResolutionTable::prefetch(ctx).await?;
        let mut rendered = Vec::with_capacity(want.components.len());
        for (name, filters) in &want.components {
            rendered.push(
                self.render(ctx, &table, *name, filters, &want.global_filters)
                    .await?,
            );
        }
        Ok(rendered)
    }

    async fn get_diff_merged(
        &self,
        ctx: &mut RunContext,
        want: &GenerationRequest,
        have: &Vec<RenderedComponent>,
    ) -> OrchResult<()> {
        let module = self.catalog.module();
        let counts: Map<String, Value> = have
            .iter()
            .map(|c| (c.name.to_string(), Value::from(c.entries.len())))
            .collect();

        if have.iter().all(|c| c.entries.is_empty()) {
            let summary = json!({
                "message": format!("No configurations found for module '{}'; no file was written.", module),
                "configurations_count": counts,
            });
            ctx.result.set_msg(summary.clone());
            ctx.result.push_response(summary);
            return Ok(());
        }

        let (path, overwrite) = match &want.file_path {
            Some(path) => (path.clone(), true),
            None => (
                PathBuf::from(default_file_name(module, Local::now().naive_local())),
                false,
            ),
        };
        write_playbook(&path, &playbook_document(have), overwrite).await?;

        let summary = json!({
            "message": format!("YAML config generation succeeded for module '{}'.", module),
            "file_path": path.display().to_string(),
            "configurations_count": counts,
        });
        ctx.result.set_msg(summary.clone());
        ctx.result.push_response(summary);
        Ok(())
    }
}
