//! # Payroll Arithmetic
//!
//! Monthly salary computation with absence deductions.
//!
//! ```text
//! daily rate = monthly salary / 26
//! deduction  = daily rate × absence days      (rounded to cents)
//! final      = monthly salary − deduction
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Absence, Employee, MonthKey, SalaryLine};
use crate::WORKING_DAYS_PER_MONTH;

/// Result of a salary computation, before it is paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRun {
    pub month: MonthKey,
    pub lines: Vec<SalaryLine>,
    pub total: Money,
}

/// Computes the pay of every active employee for `month`.
///
/// Employees without an absence record for the month lose nothing.
/// Fails if nobody is active.
pub fn compute_salaries(
    employees: &[Employee],
    absences: &[Absence],
    month: MonthKey,
) -> CoreResult<SalaryRun> {
    let lines: Vec<SalaryLine> = employees
        .iter()
        .filter(|e| e.active)
        .map(|employee| {
            let days = absences
                .iter()
                .find(|a| a.employee_id == employee.id && a.month == month)
                .map(|a| a.days)
                .unwrap_or_default();
            salary_line(employee, days)
        })
        .collect();

    if lines.is_empty() {
        return Err(ValidationError::empty("active employees").into());
    }

    let total = lines.iter().map(|l| l.final_salary).sum();
    Ok(SalaryRun { month, lines, total })
}

fn salary_line(employee: &Employee, absence_days: Decimal) -> SalaryLine {
    let daily = employee
        .monthly_salary
        .divided_by(Decimal::from(WORKING_DAYS_PER_MONTH));
    let deduction = daily.times(absence_days).rounded();
    SalaryLine {
        employee_id: employee.id.clone(),
        employee_name: employee.name.clone(),
        monthly_salary: employee.monthly_salary,
        absence_days,
        deduction,
        final_salary: employee.monthly_salary - deduction,
    }
}

/// Name of the charge generated when salaries of `month` are paid.
pub fn salary_charge_name(month: MonthKey) -> String {
    format!("Salaires {}", month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::new_id;
    use chrono::NaiveDate;

    fn employee(name: &str, salary: i64, active: bool) -> Employee {
        let mut e = Employee::new(
            name,
            Money::from_units(salary),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        )
        .unwrap();
        e.active = active;
        e
    }

    #[test]
    fn test_absence_deduction() {
        let month: MonthKey = "2024-03".parse().unwrap();
        let amina = employee("Amina", 2600, true);
        let youssef = employee("Youssef", 3000, true);
        let absences = vec![Absence {
            id: new_id(),
            employee_id: amina.id.clone(),
            month,
            days: Decimal::from(2),
        }];

        let run = compute_salaries(&[amina, youssef], &absences, month).unwrap();
        assert_eq!(run.lines[0].deduction, Money::from_units(200));
        assert_eq!(run.lines[0].final_salary, Money::from_units(2400));
        assert_eq!(run.lines[1].final_salary, Money::from_units(3000));
        assert_eq!(run.total, Money::from_units(5400));
    }

    #[test]
    fn test_absence_of_other_month_ignored() {
        let march: MonthKey = "2024-03".parse().unwrap();
        let april: MonthKey = "2024-04".parse().unwrap();
        let amina = employee("Amina", 2600, true);
        let absences = vec![Absence {
            id: new_id(),
            employee_id: amina.id.clone(),
            month: april,
            days: Decimal::from(5),
        }];

        let run = compute_salaries(&[amina], &absences, march).unwrap();
        assert_eq!(run.total, Money::from_units(2600));
    }

    #[test]
    fn test_inactive_employees_skipped() {
        let month: MonthKey = "2024-03".parse().unwrap();
        let gone = employee("Karim", 3000, false);
        assert!(compute_salaries(&[gone.clone()], &[], month).is_err());

        let run = compute_salaries(&[gone, employee("Sara", 2000, true)], &[], month).unwrap();
        assert_eq!(run.lines.len(), 1);
    }

    #[test]
    fn test_charge_name() {
        let month: MonthKey = "2024-03".parse().unwrap();
        assert_eq!(salary_charge_name(month), "Salaires 2024-03");
    }
}
