//! Workflow template catalog.
//!
//! The built-in templates are always present. Extra templates can be loaded
//! from a YAML document keyed by template id:
//!
//! ```yaml
//! restock_check:
//!   name: Restock Check
//!   description: Inventory sweep followed by a pricing pass
//!   agents: [inventory_agent, pricing_agent]
//!   steps: [analyze_stock, adjust_prices]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::models::WorkflowTemplate;

#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    templates: BTreeMap<String, WorkflowTemplate>,
}

impl WorkflowCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let templates = [
            WorkflowTemplate::new(
                "customer_optimization",
                "Customer Experience Optimization",
                "Comprehensive customer analysis and experience enhancement",
                &["customer_agent", "personalization_agent", "pricing_agent"],
                &["analyze_customer", "generate_recommendations", "optimize_pricing"],
            ),
            WorkflowTemplate::new(
                "fraud_detection",
                "Fraud Detection and Prevention",
                "Multi-layer fraud analysis and risk assessment",
                &["fraud_agent", "customer_agent"],
                &["assess_risk", "analyze_behavior", "make_decision"],
            ),
            WorkflowTemplate::new(
                "inventory_optimization",
                "Inventory Management Optimization",
                "Smart inventory management and demand forecasting",
                &["inventory_agent", "pricing_agent"],
                &["analyze_stock", "forecast_demand", "optimize_pricing"],
            ),
            WorkflowTemplate::new(
                "price_adjustment",
                "Dynamic Price Adjustment",
                "Real-time pricing optimization based on market conditions",
                &["pricing_agent", "inventory_agent", "customer_agent"],
                &["analyze_market", "assess_inventory", "segment_customers", "set_prices"],
            ),
        ];
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
        }
    }

    /// Parse a YAML map of `id -> template`.
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let raw: BTreeMap<String, WorkflowTemplate> =
            serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse workflow YAML: {}", e))?;

        let mut templates = BTreeMap::new();
        for (id, mut template) in raw {
            if id.trim().is_empty() {
                return Err("Workflow id must not be empty".to_string());
            }
            if template.agents.is_empty() {
                return Err(format!("Workflow '{}' lists no agents", id));
            }
            template.id = id.clone();
            templates.insert(id, template);
        }
        Ok(Self { templates })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read workflow file {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    /// Add every template of `other`, overriding same-id entries.
    pub fn merge(mut self, other: WorkflowCatalog) -> Self {
        self.templates.extend(other.templates);
        self
    }

    pub fn insert(&mut self, template: WorkflowTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(id)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<WorkflowTemplate> {
        self.templates.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = WorkflowCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        let fraud = catalog.get("fraud_detection").unwrap();
        assert_eq!(fraud.agents, vec!["fraud_agent", "customer_agent"]);
        assert_eq!(fraud.steps.len(), 3);
        assert_eq!(fraud.step_label(2), "make_decision");
    }

    #[test]
    fn test_yaml_merge_overrides_builtin() {
        let yaml = r#"
fraud_detection:
  name: Fraud Only
  agents: [fraud_agent]
restock_check:
  name: Restock Check
  agents: [inventory_agent, pricing_agent]
  steps: [analyze_stock]
"#;
        let catalog = WorkflowCatalog::builtin().merge(WorkflowCatalog::from_yaml(yaml).unwrap());
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get("fraud_detection").unwrap().agents.len(), 1);
        let restock = catalog.get("restock_check").unwrap();
        assert_eq!(restock.id, "restock_check");
        assert_eq!(restock.step_label(1), "pricing_agent");
    }

    #[test]
    fn test_yaml_rejects_template_without_agents() {
        let err = WorkflowCatalog::from_yaml("empty:\n  name: Empty\n  agents: []\n").unwrap_err();
        assert!(err.contains("no agents"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflows.yaml");
        std::fs::write(&path, "solo:\n  name: Solo\n  agents: [pricing_agent]\n").unwrap();
        let catalog = WorkflowCatalog::from_file(&path).unwrap();
        assert_eq!(catalog.names(), vec!["solo"]);

        assert!(WorkflowCatalog::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
