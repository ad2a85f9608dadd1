//! Request validation pipeline.

use crate::dto::validation::{
    DataExists, Locale, Rule, Validate, ValidationContext, ValidationErrors, ValidationRejection,
};
use log::debug;
use serde_json::Value;

/// Validates raw JSON payloads into DTOs before handlers run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationPipe {
    locale: Locale,
}

impl ValidationPipe {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Validates `payload` without storage-backed rules available.
    pub fn transform<T: Validate>(&self, payload: &Value) -> Result<T, ValidationRejection> {
        self.run(payload, ValidationContext::new(self.locale))
    }

    /// Validates `payload` with `store` answering existence rules.
    pub fn transform_with<T: Validate>(
        &self,
        payload: &Value,
        store: &dyn DataExists,
    ) -> Result<T, ValidationRejection> {
        self.run(
            payload,
            ValidationContext::new(self.locale).with_store(store),
        )
    }

    fn run<T: Validate>(
        &self,
        payload: &Value,
        ctx: ValidationContext<'_>,
    ) -> Result<T, ValidationRejection> {
        let Value::Object(record) = payload else {
            let mut errors = ValidationErrors::new(self.locale);
            errors.add("body", Rule::IsObject);
            return Err(errors.into_rejection());
        };

        T::validate(record, &ctx).inspect_err(|rejection| {
            debug!(
                "event=dto_validate module=dto status=error dto={} fields={}",
                std::any::type_name::<T>(),
                rejection.errors.len()
            );
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ValidationPipe;
    use crate::dto::query::{DeleteDto, ListQueryDto};
    use crate::dto::validation::Locale;
    use serde_json::json;

    #[test]
    fn non_object_payload_is_rejected_once() {
        let rejection = ValidationPipe::default()
            .transform::<DeleteDto>(&json!(["not", "an", "object"]))
            .unwrap_err();
        assert_eq!(rejection.status, 400);
        assert_eq!(rejection.errors.len(), 1);
        assert!(rejection.field("body").unwrap().has("is_object"));
    }

    #[test]
    fn messages_use_pipe_locale() {
        let rejection = ValidationPipe::new(Locale::ZhCn)
            .transform::<ListQueryDto>(&json!({ "page": 0 }))
            .unwrap_err();
        let page = rejection.field("page").unwrap();
        assert_eq!(page.constraints["min"], "page不能小于1");
    }
}
