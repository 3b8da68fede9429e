//! Read contract for the external department/holiday catalog.
//!
//! The engine never owns catalog lifecycle; callers resolve departments and
//! filter holiday dates before invoking the booking paths. Shapes are
//! validated here, at the boundary where external data enters the core.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Department;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("department record missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Department listing as served by the external catalog.
pub trait DepartmentCatalog: Send + Sync {
    fn list_departments(&self, active_only: bool) -> Vec<Department>;
}

/// Blocked calendar dates. Consulted by the caller before booking; the
/// engine itself performs no holiday check.
pub trait HolidayCalendar: Send + Sync {
    fn list_holidays(&self) -> Vec<NaiveDate>;
}

/// Shape check applied where catalog records cross into the engine.
pub fn validate_department(department: &Department) -> Result<(), CatalogError> {
    if department.id.is_empty() {
        return Err(CatalogError::MissingField { field: "id" });
    }
    if department.code.is_empty() {
        return Err(CatalogError::MissingField { field: "code" });
    }
    if department.name.is_empty() {
        return Err(CatalogError::MissingField { field: "name" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept() -> Department {
        Department {
            id: "dept-1".to_string(),
            code: "rto".to_string(),
            name: "RTO Office".to_string(),
            location: "Block A".to_string(),
            active: true,
        }
    }

    #[test]
    fn complete_department_passes() {
        assert!(validate_department(&dept()).is_ok());
    }

    #[test]
    fn missing_code_is_rejected() {
        let mut department = dept();
        department.code.clear();
        let err = validate_department(&department).unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { field: "code" }));
    }
}
