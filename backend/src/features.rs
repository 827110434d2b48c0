use crate::error::{PredictorError, PredictorResult};
use crate::models::{
    EducationLevel, FeatureVector, FormSubmission, IncomeLevel, UserInput, ANSWER_NO, ANSWER_YES,
    MAX_AGE, MIN_AGE,
};

fn parse_answer(field: &'static str, value: &str) -> PredictorResult<bool> {
    match value {
        ANSWER_YES => Ok(true),
        ANSWER_NO => Ok(false),
        other => Err(PredictorError::UnknownLabel {
            field,
            label: other.to_string(),
        }),
    }
}

impl TryFrom<&FormSubmission> for UserInput {
    type Error = PredictorError;

    fn try_from(form: &FormSubmission) -> PredictorResult<Self> {
        let income =
            IncomeLevel::from_label(&form.income).ok_or_else(|| PredictorError::UnknownLabel {
                field: "income",
                label: form.income.clone(),
            })?;
        let education = EducationLevel::from_label(&form.education).ok_or_else(|| {
            PredictorError::UnknownLabel {
                field: "education",
                label: form.education.clone(),
            }
        })?;

        let age = u8::try_from(form.age)
            .ok()
            .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
            .ok_or(PredictorError::AgeOutOfRange(form.age))?;

        Ok(UserInput {
            income,
            education,
            age,
            is_parent: parse_answer("parent", &form.parent)?,
            is_married: parse_answer("married", &form.married)?,
            is_female: parse_answer("female", &form.female)?,
        })
    }
}

/// Maps a validated input onto the classifier's feature layout.
pub fn encode(input: &UserInput) -> FeatureVector {
    FeatureVector {
        income: input.income.code(),
        education: input.education.code(),
        parent: u8::from(input.is_parent),
        marital: u8::from(input.is_married),
        age: input.age,
        female: u8::from(input.is_female),
    }
}

pub fn encode_form(form: &FormSubmission) -> PredictorResult<FeatureVector> {
    let input = UserInput::try_from(form)?;
    Ok(encode(&input))
}
