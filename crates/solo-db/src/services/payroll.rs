//! # Payroll Service
//!
//! Employees, monthly absences, salary runs and their generated charge.
//!
//! ## Paying a Month
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_salaries(month)                                                │
//! │       │   daily = monthly / 26, final = monthly − daily × absent days   │
//! │       ▼                                                                 │
//! │  WriteBatch                                                             │
//! │  ├── Create charges/<c>        { type: salary, name: "Salaires YYYY-MM" }│
//! │  └── Create salaryPayments/<p> { …, chargeId: c }                       │
//! │                                                                         │
//! │  delete_salary_payment(p)                                               │
//! │  ├── chargeId stored         → delete that charge                       │
//! │  └── no chargeId (older run) → match type + name + amount (±0.01)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use solo_core::payroll::{compute_salaries, salary_charge_name, SalaryRun};
use solo_core::validation::validate_absence_days;
use solo_core::{
    new_id, Absence, Charge, ChargeKind, Employee, Money, MonthKey, SalaryPayment,
};

use crate::error::DbResult;
use crate::repository::Repository;
use crate::store::{Collection, SharedStore, WriteBatch};

/// What happened to the charge of a deleted salary payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChargeCleanup {
    Removed { charge_id: String },
    /// The payment was deleted but no charge matched it.
    NotFound,
}

#[derive(Clone)]
pub struct PayrollService {
    store: SharedStore,
    employees: Repository<Employee>,
    absences: Repository<Absence>,
    payments: Repository<SalaryPayment>,
    charges: Repository<Charge>,
}

impl PayrollService {
    pub fn new(store: SharedStore) -> Self {
        PayrollService {
            employees: Repository::new(store.clone()),
            absences: Repository::new(store.clone()),
            payments: Repository::new(store.clone()),
            charges: Repository::new(store.clone()),
            store,
        }
    }

    // =========================================================================
    // Employees
    // =========================================================================

    pub async fn list_employees(&self) -> DbResult<Vec<Employee>> {
        self.employees.list().await
    }

    pub async fn create_employee(
        &self,
        name: &str,
        monthly_salary: Money,
        start_date: NaiveDate,
    ) -> DbResult<Employee> {
        let employee = Employee::new(name, monthly_salary, start_date)?;
        self.employees.create(&employee).await?;
        info!(employee_id = %employee.id, name = %employee.name, "Employee created");
        Ok(employee)
    }

    pub async fn update_employee(&self, employee: &Employee) -> DbResult<()> {
        let current = self.employees.require(&employee.id).await?;
        // Same rules as creation.
        let checked = Employee::new(&employee.name, employee.monthly_salary, employee.start_date)?;
        let updated = Employee {
            id: current.id,
            created_at: current.created_at,
            active: employee.active,
            ..checked
        };
        self.employees.save(&updated).await
    }

    /// Deletes an employee together with their absences.
    pub async fn delete_employee(&self, id: &str) -> DbResult<usize> {
        self.employees.require(id).await?;
        let absences: Vec<Absence> = self
            .absences
            .list()
            .await?
            .into_iter()
            .filter(|a| a.employee_id == id)
            .collect();

        let mut batch = WriteBatch::new();
        for absence in &absences {
            batch.delete(Collection::Absences, &absence.id);
        }
        batch.delete(Collection::Employees, id);
        self.store.commit(batch).await?;

        info!(employee_id = %id, absences = absences.len(), "Employee deleted");
        Ok(absences.len())
    }

    // =========================================================================
    // Absences
    // =========================================================================

    pub async fn list_absences(&self, month: MonthKey) -> DbResult<Vec<Absence>> {
        Ok(self
            .absences
            .list()
            .await?
            .into_iter()
            .filter(|a| a.month == month)
            .collect())
    }

    /// Creates or replaces the absence count of one employee for one month.
    pub async fn set_absence(
        &self,
        employee_id: &str,
        month: MonthKey,
        days: Decimal,
    ) -> DbResult<Absence> {
        validate_absence_days(days)?;
        self.employees.require(employee_id).await?;

        let existing = self
            .absences
            .list()
            .await?
            .into_iter()
            .find(|a| a.employee_id == employee_id && a.month == month);
        let absence = Absence {
            id: existing.map(|a| a.id).unwrap_or_else(new_id),
            employee_id: employee_id.to_string(),
            month,
            days,
        };
        self.absences.save(&absence).await?;
        Ok(absence)
    }

    // =========================================================================
    // Salary Runs
    // =========================================================================

    pub async fn compute_salaries(&self, month: MonthKey) -> DbResult<SalaryRun> {
        let employees = self.employees.list().await?;
        let absences = self.absences.list().await?;
        Ok(compute_salaries(&employees, &absences, month)?)
    }

    pub async fn list_payments(&self) -> DbResult<Vec<SalaryPayment>> {
        self.payments.list().await
    }

    /// Records the payment of a month and its salary charge in one batch.
    pub async fn pay_salaries(&self, month: MonthKey, paid_on: NaiveDate) -> DbResult<SalaryPayment> {
        let run = self.compute_salaries(month).await?;

        let mut charge = Charge::new(&salary_charge_name(month), run.total, paid_on)?;
        charge.kind = Some(ChargeKind::Salary);

        let payment = SalaryPayment {
            id: new_id(),
            month,
            lines: run.lines,
            total_amount: run.total,
            payment_date: Utc::now(),
            charge_id: Some(charge.id.clone()),
        };

        let mut batch = WriteBatch::new();
        batch.create(&charge)?.create(&payment)?;
        self.store.commit(batch).await?;

        info!(
            payment_id = %payment.id,
            month = %month,
            total = %payment.total_amount,
            charge_id = %charge.id,
            "Salaries paid"
        );
        Ok(payment)
    }

    /// Deletes a salary payment and the charge it generated.
    pub async fn delete_salary_payment(&self, id: &str) -> DbResult<ChargeCleanup> {
        let payment = self.payments.require(id).await?;
        let charge_id = match &payment.charge_id {
            Some(charge_id) => self.charges.get(charge_id).await?.map(|c| c.id),
            None => {
                let name = salary_charge_name(payment.month);
                self.charges
                    .list()
                    .await?
                    .into_iter()
                    .find(|c| {
                        c.kind == Some(ChargeKind::Salary)
                            && c.name == name
                            && c.amount.approx_eq(payment.total_amount)
                    })
                    .map(|c| c.id)
            }
        };

        let mut batch = WriteBatch::new();
        batch.delete(Collection::SalaryPayments, id);
        if let Some(charge_id) = &charge_id {
            batch.delete(Collection::Charges, charge_id);
        }
        self.store.commit(batch).await?;

        match charge_id {
            Some(charge_id) => {
                info!(payment_id = %id, charge_id = %charge_id, "Salary payment deleted with its charge");
                Ok(ChargeCleanup::Removed { charge_id })
            }
            None => {
                warn!(payment_id = %id, month = %payment.month, "Salary payment deleted, no matching charge found");
                Ok(ChargeCleanup::NotFound)
            }
        }
    }
}
