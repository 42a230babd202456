use crate::imports::*;

/*
    Traits:
    * ValueTransform - Turns one validated raw value into the value stored on a row.
      Modelled as async so every value carries a suspension point, even when the transform is plain coercion.

    Types:
    * CoercingTransform - Default transform, applies the parameter's coercion rules
*/
#[async_trait]
pub trait ValueTransform: Send + Sync {
    async fn transform(&self, parameter: &Parameter, raw: &RawValue) -> Result<ParameterValue>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoercingTransform;

#[async_trait]
impl ValueTransform for CoercingTransform {
    async fn transform(&self, parameter: &Parameter, raw: &RawValue) -> Result<ParameterValue> {
        Ok(coerce_for_parameter(parameter, raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn coercing_transform_follows_parameter_type() {
        let width = Parameter::bim("Width", "Width", ValueType::Number, json!(0));
        let value = CoercingTransform.transform(&width, &json!("50%")).await.unwrap();
        assert_eq!(value, ParameterValue::Number(0.5));

        let equation = json!({"expression": "A * 2"});
        let err = CoercingTransform.transform(&width, &equation).await.unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }
}
