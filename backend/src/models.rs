use serde::{Deserialize, Serialize};

/// Column order the trained classifier was fitted with.
pub const FEATURE_NAMES: [&str; 6] = ["income", "education", "parent", "marital", "age", "female"];

pub const MIN_AGE: u8 = 18;
pub const MAX_AGE: u8 = 98;
pub const DEFAULT_AGE: u8 = 30;

pub const ANSWER_NO: &str = "No";
pub const ANSWER_YES: &str = "Yes";

pub const POSITIVE_CATEGORY: &str = "LinkedIn User";
pub const NEGATIVE_CATEGORY: &str = "Not a LinkedIn User";
pub const POSITIVE_OUTCOME: &str = "LinkedIn User";
pub const NEGATIVE_OUTCOME: &str = "Not LinkedIn User";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncomeLevel {
    Under10k,
    From10kTo20k,
    From20kTo30k,
    From30kTo40k,
    From40kTo50k,
    From50kTo75k,
    From75kTo100k,
    From100kTo150k,
    Over150k,
}

impl IncomeLevel {
    pub const ALL: [IncomeLevel; 9] = [
        IncomeLevel::Under10k,
        IncomeLevel::From10kTo20k,
        IncomeLevel::From20kTo30k,
        IncomeLevel::From30kTo40k,
        IncomeLevel::From40kTo50k,
        IncomeLevel::From50kTo75k,
        IncomeLevel::From75kTo100k,
        IncomeLevel::From100kTo150k,
        IncomeLevel::Over150k,
    ];

    pub fn code(self) -> u8 {
        match self {
            IncomeLevel::Under10k => 1,
            IncomeLevel::From10kTo20k => 2,
            IncomeLevel::From20kTo30k => 3,
            IncomeLevel::From30kTo40k => 4,
            IncomeLevel::From40kTo50k => 5,
            IncomeLevel::From50kTo75k => 6,
            IncomeLevel::From75kTo100k => 7,
            IncomeLevel::From100kTo150k => 8,
            IncomeLevel::Over150k => 9,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IncomeLevel::Under10k => "Less than $10,000",
            IncomeLevel::From10kTo20k => "$10,000 to $19,999",
            IncomeLevel::From20kTo30k => "$20,000 to $29,999",
            IncomeLevel::From30kTo40k => "$30,000 to $39,999",
            IncomeLevel::From40kTo50k => "$40,000 to $49,999",
            IncomeLevel::From50kTo75k => "$50,000 to $74,999",
            IncomeLevel::From75kTo100k => "$75,000 to $99,999",
            IncomeLevel::From100kTo150k => "$100,000 to $150,000",
            IncomeLevel::Over150k => "Greater than $150,000",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationLevel {
    LessThanHighSchool,
    HighSchoolIncomplete,
    HighSchoolGraduate,
    SomeCollege,
    AssociateDegree,
    BachelorDegree,
    SomePostgraduate,
    PostgraduateDegree,
}

impl EducationLevel {
    pub const ALL: [EducationLevel; 8] = [
        EducationLevel::LessThanHighSchool,
        EducationLevel::HighSchoolIncomplete,
        EducationLevel::HighSchoolGraduate,
        EducationLevel::SomeCollege,
        EducationLevel::AssociateDegree,
        EducationLevel::BachelorDegree,
        EducationLevel::SomePostgraduate,
        EducationLevel::PostgraduateDegree,
    ];

    pub fn code(self) -> u8 {
        match self {
            EducationLevel::LessThanHighSchool => 1,
            EducationLevel::HighSchoolIncomplete => 2,
            EducationLevel::HighSchoolGraduate => 3,
            EducationLevel::SomeCollege => 4,
            EducationLevel::AssociateDegree => 5,
            EducationLevel::BachelorDegree => 6,
            EducationLevel::SomePostgraduate => 7,
            EducationLevel::PostgraduateDegree => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EducationLevel::LessThanHighSchool => "Less than high school",
            EducationLevel::HighSchoolIncomplete => "High school incomplete",
            EducationLevel::HighSchoolGraduate => "High school graduate",
            EducationLevel::SomeCollege => "Some college, no degree",
            EducationLevel::AssociateDegree => "Two-year associate degree",
            EducationLevel::BachelorDegree => "Four-year college/university degree",
            EducationLevel::SomePostgraduate => "Some postgraduate or professional schooling",
            EducationLevel::PostgraduateDegree => "Postgraduate or professional degree",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.label() == label)
    }
}

/// One validated form submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserInput {
    pub income: IncomeLevel,
    pub education: EducationLevel,
    pub age: u8,
    pub is_parent: bool,
    pub is_married: bool,
    pub is_female: bool,
}

/// Raw form fields as posted by the page: labels and "No"/"Yes" answers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FormSubmission {
    pub income: String,
    pub education: String,
    pub age: i64,
    pub parent: String,
    pub married: String,
    pub female: String,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVector {
    pub income: u8,
    pub education: u8,
    pub parent: u8,
    pub marital: u8,
    pub age: u8,
    pub female: u8,
}

impl FeatureVector {
    /// Values in `FEATURE_NAMES` order.
    pub fn to_array(&self) -> [f32; 6] {
        [
            f32::from(self.income),
            f32::from(self.education),
            f32::from(self.parent),
            f32::from(self.marital),
            f32::from(self.age),
            f32::from(self.female),
        ]
    }

    pub fn named_values(&self) -> Vec<(&'static str, f32)> {
        FEATURE_NAMES.into_iter().zip(self.to_array()).collect()
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    pub predicted_class: bool,
    pub positive_probability: f32,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChartBar {
    pub outcome: &'static str,
    pub probability: f32,
}

/// What the page renders for one prediction.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionView {
    pub category: &'static str,
    pub predicted_class: bool,
    pub probability: f32,
    pub probability_pct: String,
    pub features: FeatureVector,
    pub chart: Vec<ChartBar>,
}

impl PredictionView {
    pub fn new(result: PredictionResult, features: FeatureVector) -> Self {
        let p = result.positive_probability;
        let category = if result.predicted_class {
            POSITIVE_CATEGORY
        } else {
            NEGATIVE_CATEGORY
        };

        PredictionView {
            category,
            predicted_class: result.predicted_class,
            probability: p,
            probability_pct: format!("{:.1}%", p * 100.0),
            features,
            chart: vec![
                ChartBar {
                    outcome: NEGATIVE_OUTCOME,
                    probability: 1.0 - p,
                },
                ChartBar {
                    outcome: POSITIVE_OUTCOME,
                    probability: p,
                },
            ],
        }
    }
}

/// Choices offered by the form, in code order.
#[derive(Debug, Serialize, Clone)]
pub struct FormOptions {
    pub income: Vec<&'static str>,
    pub education: Vec<&'static str>,
    pub age_min: u8,
    pub age_max: u8,
    pub age_default: u8,
    pub answers: [&'static str; 2],
}

impl FormOptions {
    pub fn current() -> Self {
        FormOptions {
            income: IncomeLevel::ALL.iter().map(|l| l.label()).collect(),
            education: EducationLevel::ALL.iter().map(|l| l.label()).collect(),
            age_min: MIN_AGE,
            age_max: MAX_AGE,
            age_default: DEFAULT_AGE,
            answers: [ANSWER_NO, ANSWER_YES],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn timed(mut self, start: std::time::Instant) -> Self {
        self.execution_time_ms = Some(start.elapsed().as_millis() as u64);
        self
    }
}
