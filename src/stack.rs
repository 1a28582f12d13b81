// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack: a resolved plan plus its exported outputs
//!
//! `up` hands the plan to a provisioning engine and publishes every export
//! from the realized attributes; `down` tears the plan down and withdraws
//! the outputs.

use futures::future::try_join_all;
use std::collections::BTreeMap;
use tracing::info;

use crate::engine::{ProvisioningEngine, RealizedResource};
use crate::errors::{EngineError, EngineResult};
use crate::graph::ResolvedPlan;
use crate::outputs::{Export, Output, OutputSlot};

#[derive(Debug)]
pub struct Stack {
    plan: ResolvedPlan,
    slots: Vec<OutputSlot>,
}

impl Stack {
    pub fn new(plan: ResolvedPlan, exports: Vec<Export>) -> Self {
        Self {
            plan,
            slots: exports.into_iter().map(OutputSlot::new).collect(),
        }
    }

    pub fn plan(&self) -> &ResolvedPlan {
        &self.plan
    }

    /// Exports in declaration order
    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.slots.iter().map(OutputSlot::export)
    }

    pub fn output(&self, name: &str) -> EngineResult<Output> {
        self.slots
            .iter()
            .find(|slot| slot.export().name == name)
            .map(OutputSlot::subscribe)
            .ok_or_else(|| EngineError::UnknownOutput(name.to_string()))
    }

    pub fn outputs(&self) -> Vec<Output> {
        self.slots.iter().map(OutputSlot::subscribe).collect()
    }

    /// Current value of every output, `None` where not yet realized
    pub fn output_values(&self) -> BTreeMap<String, Option<String>> {
        self.slots
            .iter()
            .map(|slot| (slot.export().name.clone(), slot.current()))
            .collect()
    }

    /// Realize the plan and publish the outputs
    ///
    /// Outputs are published only once every one of them resolves.
    pub async fn up<E>(&self, engine: &mut E) -> EngineResult<BTreeMap<String, String>>
    where
        E: ProvisioningEngine + ?Sized,
    {
        info!(engine = engine.name(), resources = self.plan.len(), "Bringing stack up");
        let realized = engine.apply(&self.plan).await?;
        let by_name: BTreeMap<&str, &RealizedResource> = realized
            .iter()
            .map(|resource| (resource.name.as_str(), resource))
            .collect();

        let values = self
            .slots
            .iter()
            .map(|slot| {
                let export = slot.export();
                let source = &export.source;
                let resource = by_name.get(source.resource.as_str()).ok_or_else(|| {
                    EngineError::UnresolvedReference {
                        resource: export.name.clone(),
                        reference: source.resource.to_string(),
                    }
                })?;
                let value = resource.attribute(&source.attribute).ok_or_else(|| {
                    EngineError::MissingAttribute {
                        resource: source.resource.to_string(),
                        attribute: source.attribute.clone(),
                    }
                })?;
                Ok(value.to_string())
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let mut published = BTreeMap::new();
        for (slot, value) in self.slots.iter().zip(values) {
            slot.publish(value.clone());
            published.insert(slot.export().name.clone(), value);
        }

        info!(outputs = published.len(), "Published stack outputs");
        Ok(published)
    }

    /// Tear the plan down and withdraw every output
    pub async fn down<E>(&self, engine: &mut E) -> EngineResult<Vec<String>>
    where
        E: ProvisioningEngine + ?Sized,
    {
        info!(engine = engine.name(), resources = self.plan.len(), "Tearing stack down");
        let deleted = engine.destroy(&self.plan).await?;
        for slot in &self.slots {
            slot.clear();
        }
        Ok(deleted)
    }

    /// Wait until every output is published
    pub async fn wait_for_outputs(&self) -> EngineResult<BTreeMap<String, String>> {
        let waits = self.outputs().into_iter().map(|mut output| async move {
            let value = output.wait().await?;
            Ok::<_, EngineError>((output.name().to_string(), value))
        });

        Ok(try_join_all(waits).await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TopologyBuilder;
    use crate::domain::attributes;
    use crate::engine::InMemoryEngine;

    fn stack() -> Stack {
        let mut builder = TopologyBuilder::new();
        let vpc = builder.declare_network("my-vpc", "10.0.0.0/16").unwrap();
        builder.export("vpc_id", vpc.output(attributes::ID)).unwrap();
        builder.export("vpc_cidr", vpc.output(attributes::CIDR_BLOCK)).unwrap();
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn test_outputs_populated_by_up_and_cleared_by_down() {
        let stack = stack();
        let output = stack.output("vpc_cidr").unwrap();
        assert_eq!(output.get(), None);

        let mut engine = InMemoryEngine::new();
        let published = stack.up(&mut engine).await.unwrap();
        assert_eq!(published["vpc_cidr"], "10.0.0.0/16");
        assert!(published["vpc_id"].starts_with("vpc-"));
        assert_eq!(output.get().as_deref(), Some("10.0.0.0/16"));

        let deleted = stack.down(&mut engine).await.unwrap();
        assert_eq!(deleted, vec!["my-vpc".to_string()]);
        assert_eq!(output.get(), None);
    }

    #[tokio::test]
    async fn test_wait_for_outputs() {
        let stack = stack();
        let mut engine = InMemoryEngine::new();

        let (published, waited) = tokio::join!(stack.up(&mut engine), stack.wait_for_outputs());
        assert_eq!(published.unwrap(), waited.unwrap());
    }

    #[test]
    fn test_unknown_output() {
        assert!(matches!(
            stack().output("nope"),
            Err(EngineError::UnknownOutput(name)) if name == "nope"
        ));
    }

    #[tokio::test]
    async fn test_missing_attribute_publishes_nothing() {
        let mut builder = TopologyBuilder::new();
        let vpc = builder.declare_network("my-vpc", "10.0.0.0/16").unwrap();
        builder.export("vpc_id", vpc.output(attributes::ID)).unwrap();
        builder.export("vpc_ip", vpc.output(attributes::PRIVATE_IP)).unwrap();
        let stack = builder.build().unwrap();

        let mut engine = InMemoryEngine::new();
        assert!(matches!(
            stack.up(&mut engine).await,
            Err(EngineError::MissingAttribute { attribute, .. }) if attribute == "private_ip"
        ));
        assert!(stack.output_values().values().all(Option::is_none));
    }
}
