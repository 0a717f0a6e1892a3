use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::reference::Reference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Values supplied from outside the graph, addressed by key.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub externals: BTreeMap<String, Value>,
  pub steps: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub step_id: String,
  /// Operation name.
  pub op: String,
  /// Step this one is chained from.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on: Option<String>,
  #[serde(default)]
  pub args: Vec<Value>,
}

impl StepDef {
  /// Steps this one needs built first, in argument order.
  pub fn dependencies(&self) -> Vec<&str> {
    let mut references = Vec::new();
    for arg in &self.args {
      Reference::collect(arg, &mut references);
    }
    let mut deps: Vec<&str> = self.on.as_deref().into_iter().collect();
    deps.extend(references.into_iter().filter_map(|r| match r {
      Reference::Step(id) => Some(id),
      Reference::External(_) => None,
    }));
    deps
  }
}

impl PlanDef {
  pub fn step(&self, step_id: &str) -> Option<&StepDef> {
    self.steps.iter().find(|step| step.step_id == step_id)
  }

  /// Check step ids and references.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for step in &self.steps {
      if step.step_id.is_empty() {
        return Err(ConfigError::EmptyStepId);
      }
      if !seen.insert(step.step_id.as_str()) {
        return Err(ConfigError::DuplicateStep(step.step_id.clone()));
      }
    }

    for step in &self.steps {
      for dep in step.dependencies() {
        if !seen.contains(dep) {
          return Err(ConfigError::UnknownStep {
            step: step.step_id.clone(),
            reference: dep.to_string(),
          });
        }
      }
      let mut references = Vec::new();
      for arg in &step.args {
        Reference::collect(arg, &mut references);
      }
      for reference in references {
        if let Reference::External(key) = reference {
          if !self.externals.contains_key(key) {
            return Err(ConfigError::UnknownExternal {
              step: step.step_id.clone(),
              key: key.to_string(),
            });
          }
        }
      }
    }

    self.build_order().map(|_| ())
  }

  /// Steps ordered so every step follows its dependencies.
  ///
  /// Steps keep their declared order wherever dependencies allow it.
  pub fn build_order(&self) -> Result<Vec<&StepDef>, ConfigError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      Visiting,
      Done,
    }

    let index: HashMap<&str, &StepDef> = self
      .steps
      .iter()
      .map(|step| (step.step_id.as_str(), step))
      .collect();
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(self.steps.len());

    fn visit<'p>(
      step: &'p StepDef,
      index: &HashMap<&str, &'p StepDef>,
      marks: &mut HashMap<&'p str, Mark>,
      order: &mut Vec<&'p StepDef>,
    ) -> Result<(), ConfigError> {
      match marks.get(step.step_id.as_str()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => return Err(ConfigError::Cycle(step.step_id.clone())),
        None => {}
      }
      marks.insert(&step.step_id, Mark::Visiting);
      for dep in step.dependencies() {
        let dep = index.get(dep).ok_or_else(|| ConfigError::UnknownStep {
          step: step.step_id.clone(),
          reference: dep.to_string(),
        })?;
        visit(dep, index, marks, order)?;
      }
      marks.insert(&step.step_id, Mark::Done);
      order.push(step);
      Ok(())
    }

    for step in &self.steps {
      visit(step, &index, &mut marks, &mut order)?;
    }
    Ok(order)
  }
}
