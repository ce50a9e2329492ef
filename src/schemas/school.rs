use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ClassGroup, School, SchoolPolicy, Subject};
use crate::db::types::ImageMode;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    pub(crate) contact_name: Option<String>,
    #[serde(default)]
    pub(crate) contact_email: Option<String>,
    #[serde(default)]
    pub(crate) contact_phone: Option<String>,
    #[serde(default)]
    pub(crate) contract_start: Option<Date>,
    #[serde(default)]
    pub(crate) contract_end: Option<Date>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SchoolUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) slug: Option<String>,
    #[serde(default)]
    pub(crate) logo_url: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    pub(crate) contact_name: Option<String>,
    #[serde(default)]
    pub(crate) contact_email: Option<String>,
    #[serde(default)]
    pub(crate) contact_phone: Option<String>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchoolResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) slug: Option<String>,
    pub(crate) logo_url: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) contact_name: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) contact_phone: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) created_at: String,
}

impl SchoolResponse {
    pub(crate) fn from_db(school: School) -> Self {
        Self {
            id: school.id,
            name: school.name,
            slug: school.slug,
            logo_url: school.logo_url,
            address: school.address,
            contact_name: school.contact_name,
            contact_email: school.contact_email,
            contact_phone: school.contact_phone,
            notes: school.notes,
            created_at: format_primitive(school.created_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ClassGroupCreate {
    #[validate(length(min = 1, message = "display_name must not be empty"))]
    pub(crate) display_name: String,
    #[validate(range(min = 1, max = 12, message = "school_year must be between 1 and 12"))]
    pub(crate) school_year: i32,
    #[validate(length(min = 1, message = "shift must not be empty"))]
    pub(crate) shift: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ClassGroupResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) display_name: String,
    pub(crate) school_year: i32,
    pub(crate) shift: String,
}

impl ClassGroupResponse {
    pub(crate) fn from_db(class: ClassGroup) -> Self {
        Self {
            id: class.id,
            school_id: class.school_id,
            display_name: class.display_name,
            school_year: class.school_year,
            shift: class.shift,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) name: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self { id: subject.id, school_id: subject.school_id, name: subject.name }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeacherClassLink {
    pub(crate) teacher_id: String,
    pub(crate) class_group_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeacherClassSubjectLink {
    pub(crate) teacher_id: String,
    pub(crate) class_group_id: String,
    pub(crate) subject_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PolicyUpdate {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "min_adherence must be within 0..=100"))]
    pub(crate) min_adherence: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "min_coherence must be within 0..=100"))]
    pub(crate) min_coherence: Option<f64>,
    #[serde(default)]
    pub(crate) image_mode: Option<ImageMode>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PolicyResponse {
    pub(crate) school_id: String,
    pub(crate) min_adherence: Option<f64>,
    pub(crate) min_coherence: Option<f64>,
    pub(crate) image_mode: Option<ImageMode>,
    pub(crate) updated_at: String,
}

impl PolicyResponse {
    pub(crate) fn from_db(policy: SchoolPolicy) -> Self {
        Self {
            school_id: policy.school_id,
            min_adherence: policy.min_adherence,
            min_coherence: policy.min_coherence,
            image_mode: policy.image_mode,
            updated_at: format_primitive(policy.updated_at),
        }
    }
}
