use crate::imports::*;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parameters/equation.pest"] // relative to src directory
struct EquationParser;

/*
    Types:
    * EquationValue - Expression text of a user equation parameter, the names it references and the type it produces
    * EquationEvaluator - Resolves an EquationValue against the parameters of one row
    * UnresolvedEquations - Default evaluator, leaves equations untouched
*/
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquationValue {
    pub expression: String,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub result_type: ValueType,
}

impl EquationValue {
    pub fn parse(expression: impl Into<String>, result_type: ValueType) -> Result<Self> {
        let expression = expression.into();
        let references = parse_references(&expression)?;
        Ok(EquationValue {
            expression,
            references,
            result_type,
        })
    }

    // Records shaped like an equation, without re-parsing the expression
    pub fn from_raw(raw: &RawValue) -> Option<Self> {
        let map = raw.as_object()?;
        if !map.get("expression").is_some_and(|e| e.is_string()) {
            return None;
        }
        serde_json::from_value(raw.clone()).ok()
    }
}

pub fn parse_references(expression: &str) -> Result<Vec<String>> {
    let pairs = EquationParser::parse(Rule::equation, expression)
        .map_err(|e| anyhow::anyhow!("Equation parsing error in '{}': {}", expression, e))?;
    let mut references = Vec::new();
    collect_references(pairs, &mut references);
    Ok(references)
}

fn collect_references<'a>(pairs: impl Iterator<Item = Pair<'a, Rule>>, references: &mut Vec<String>) {
    for pair in pairs {
        if pair.as_rule() == Rule::reference {
            let name = reference_name(pair);
            if !references.contains(&name) {
                references.push(name);
            }
            continue;
        }
        collect_references(pair.into_inner(), references);
    }
}

fn reference_name(pair: Pair<'_, Rule>) -> String {
    let text = pair.as_str().trim().to_string();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::bracketed => {
                if let Some(name) = inner.into_inner().next() {
                    return name.as_str().trim().to_string();
                }
            }
            Rule::identifier => return inner.as_str().to_string(),
            _ => {}
        }
    }
    text
}

pub trait EquationEvaluator: Send + Sync {
    fn evaluate(&self, equation: &EquationValue, row: &BTreeMap<String, ParameterValueState>) -> Result<ParameterValue>;
}

pub struct UnresolvedEquations;

impl EquationEvaluator for UnresolvedEquations {
    fn evaluate(&self, equation: &EquationValue, _row: &BTreeMap<String, ParameterValueState>) -> Result<ParameterValue> {
        Ok(ParameterValue::Equation(equation.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifiers() {
        let refs = parse_references("Length * Width + 2").unwrap();
        assert_eq!(refs, vec!["Length", "Width"]);
    }

    #[test]
    fn bracketed_names_with_spaces() {
        let refs = parse_references("[Unit Cost] * [Quantity] / 100").unwrap();
        assert_eq!(refs, vec!["Unit Cost", "Quantity"]);
    }

    #[test]
    fn function_names_are_not_references() {
        let refs = parse_references("round(Area, 2) + max(Height, [Min Height])").unwrap();
        assert_eq!(refs, vec!["Area", "Height", "Min Height"]);
    }

    #[test]
    fn literals_and_duplicates() {
        let refs = parse_references("Fire.Rating == 'EI60' && (Width > 0.5 || Width < -1) != false").unwrap();
        assert_eq!(refs, vec!["Fire.Rating", "Width"]);
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(parse_references("Length *").is_err());
        assert!(parse_references("(Length").is_err());
        assert!(parse_references("").is_err());
    }

    #[test]
    fn from_raw_requires_expression() {
        let raw = serde_json::json!({"expression": "A + B", "resultType": "number"});
        let equation = EquationValue::from_raw(&raw).unwrap();
        assert_eq!(equation.result_type, ValueType::Number);
        assert!(equation.references.is_empty());
        assert!(EquationValue::from_raw(&serde_json::json!({"value": 1})).is_none());
    }

    #[test]
    fn unresolved_evaluator_is_identity() {
        let equation = EquationValue::parse("A * 2", ValueType::Number).unwrap();
        let out = UnresolvedEquations.evaluate(&equation, &BTreeMap::new()).unwrap();
        assert_eq!(out, ParameterValue::Equation(equation));
    }
}
