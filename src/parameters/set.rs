use crate::imports::*;

/*
    Types:
    * ParameterSet - A user's whole parameter set, keyed by id, in insertion order.
      Ids are unique and no two parameters share a (group, name) pair.
*/
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parameters(parameters: impl IntoIterator<Item = Parameter>) -> std::result::Result<Self, NamingConflict> {
        let mut set = Self::new();
        for parameter in parameters {
            set.insert(parameter)?;
        }
        Ok(set)
    }

    // Persisted layout is an id -> Parameter record; the map key wins over a stale inner id
    pub fn from_record(record: HashMap<String, Parameter>) -> std::result::Result<Self, NamingConflict> {
        let mut entries: Vec<(String, Parameter)> = record.into_iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| a.order().cmp(&b.order()).then_with(|| a_id.cmp(b_id)));
        Self::from_parameters(entries.into_iter().map(|(id, parameter)| parameter.with_id(id)))
    }

    pub fn to_record(&self) -> HashMap<String, Parameter> {
        self.parameters
            .iter()
            .map(|p| (p.id().to_string(), p.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id() == id)
    }

    pub fn into_vec(self) -> Vec<Parameter> {
        self.parameters
    }

    pub fn check_insert(&self, candidate: &Parameter) -> std::result::Result<(), NamingConflict> {
        if self.get(candidate.id()).is_some() {
            return Err(NamingConflict::DuplicateParameterId {
                id: candidate.id().to_string(),
            });
        }
        let group = candidate.group().display();
        if self
            .parameters
            .iter()
            .any(|p| p.name() == candidate.name() && p.group().display() == group)
        {
            return Err(NamingConflict::DuplicateParameterName {
                group: group.to_string(),
                name: candidate.name().to_string(),
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, parameter: Parameter) -> std::result::Result<(), NamingConflict> {
        self.check_insert(&parameter)?;
        tracing::debug!(
            id = parameter.id(),
            name = parameter.name(),
            kind = parameter.kind(),
            "Added parameter to set"
        );
        self.parameters.push(parameter);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Parameter> {
        let index = self.parameters.iter().position(|p| p.id() == id)?;
        Some(self.parameters.remove(index))
    }

    // BIM parameters mirror model data and refuse edits
    pub fn update_user_value(&mut self, id: &str, value: ParameterValue) -> Result<()> {
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.id() == id)
            .with_context(|| format!("Parameter '{}' not found", id))?;
        match parameter {
            Parameter::Bim(_) => Err(anyhow::anyhow!(
                "Parameter '{}' is a BIM parameter and cannot be edited",
                id
            )),
            Parameter::User(user) => {
                if let ParameterValue::Equation(equation) = &value {
                    user.user_type = UserParameterType::Equation;
                    user.equation = Some(equation.expression.clone());
                } else {
                    user.user_type = UserParameterType::Fixed;
                    user.equation = None;
                }
                user.value = value;
                Ok(())
            }
        }
    }

    pub fn validate_equations(&self) -> std::result::Result<(), NamingConflict> {
        for parameter in &self.parameters {
            let Some(equation) = parameter.value().as_equation() else {
                continue;
            };
            for reference in &equation.references {
                let known = self
                    .parameters
                    .iter()
                    .any(|p| p.name() == reference || p.field() == reference);
                if !known {
                    return Err(NamingConflict::UnknownEquationReference {
                        parameter: parameter.name().to_string(),
                        reference: reference.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
