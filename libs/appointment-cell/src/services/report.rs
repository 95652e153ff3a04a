use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::{Patient, PatientService};
use shared_models::time::to_wire;

use crate::models::{Appointment, AppointmentError, ReportJob, ReportStatus};
use crate::services::clock::Clock;
use crate::state::AppointmentCellState;
use crate::store::AppointmentStore;

const CSV_HEADER: &str = "appointment_id,doctor,patient,start_time,end_time,reason,status";

/// How long a finished job stays queryable.
pub const REPORT_JOB_RETENTION_HOURS: i64 = 24;

/// In-process job table. Jobs do not survive a restart; finished ones are
/// swept once older than the retention window.
#[derive(Default)]
pub struct ReportRegistry {
    jobs: RwLock<HashMap<Uuid, ReportJob>>,
}

impl ReportRegistry {
    pub async fn get(&self, job_id: Uuid) -> Option<ReportJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    async fn insert(&self, job: ReportJob) {
        let cutoff = job.created_at - Duration::hours(REPORT_JOB_RETENTION_HOURS);
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, existing| existing.finished_at.map_or(true, |finished| finished > cutoff));
        if jobs.len() < before {
            debug!("Swept {} expired report jobs", before - jobs.len());
        }
        jobs.insert(job.id, job);
    }

    async fn finish(&self, job_id: Uuid, outcome: Result<PathBuf, AppointmentError>, now: DateTime<Utc>) {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return;
        };
        match outcome {
            Ok(path) => {
                job.status = ReportStatus::Completed;
                job.file_path = Some(path.to_string_lossy().into_owned());
            }
            Err(e) => {
                job.status = ReportStatus::Failed;
                job.error = Some(e.to_string());
            }
        }
        job.finished_at = Some(now);
    }
}

/// Generates a patient's appointment history as CSV in the background.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn AppointmentStore>,
    doctors: DoctorService,
    patients: PatientService,
    registry: Arc<ReportRegistry>,
    clock: Arc<dyn Clock>,
    output_dir: PathBuf,
}

impl ReportService {
    pub fn new(state: &AppointmentCellState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            doctors: DoctorService::new(&state.doctors),
            patients: PatientService::new(&state.patients),
            registry: Arc::clone(&state.reports),
            clock: Arc::clone(&state.clock),
            output_dir: state.config.report_output_dir.clone(),
        }
    }

    /// Registers a PENDING job and returns at once; the file is written by a
    /// spawned task.
    pub async fn request_patient_report(&self, patient_id: Uuid) -> Result<ReportJob, AppointmentError> {
        let patient = self.patients.get_patient(patient_id).await?;

        let job = ReportJob {
            id: Uuid::new_v4(),
            patient_id,
            status: ReportStatus::Pending,
            file_path: None,
            error: None,
            created_at: self.clock.now(),
            finished_at: None,
        };
        self.registry.insert(job.clone()).await;
        info!("Report job {} queued for patient {}", job.id, patient_id);

        let worker = self.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            let outcome = worker.write_report(job_id, &patient).await;
            match &outcome {
                Ok(path) => info!("Report job {} written to {}", job_id, path.display()),
                Err(e) => error!("Report job {} failed: {}", job_id, e),
            }
            worker.registry.finish(job_id, outcome, worker.clock.now()).await;
        });

        Ok(job)
    }

    pub async fn job_status(&self, job_id: Uuid) -> Result<ReportJob, AppointmentError> {
        self.registry.get(job_id).await.ok_or(AppointmentError::ReportNotFound)
    }

    async fn write_report(&self, job_id: Uuid, patient: &Patient) -> Result<PathBuf, AppointmentError> {
        let appointments = self.store.list_all_by_patient(patient.id).await?;
        debug!("Report job {}: {} appointments", job_id, appointments.len());

        let doctor_names = self.doctor_names(&appointments).await;
        let csv = render_csv(&appointments, &doctor_names, &patient.full_name());

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppointmentError::ReportFailed(e.to_string()))?;
        let path = self.output_dir.join(format!("appointments_{}.csv", job_id));
        tokio::fs::write(&path, csv)
            .await
            .map_err(|e| AppointmentError::ReportFailed(e.to_string()))?;
        Ok(path)
    }

    /// Doctors that can no longer be loaded are written by id.
    async fn doctor_names(&self, appointments: &[Appointment]) -> HashMap<Uuid, String> {
        let mut ids: Vec<Uuid> = appointments.iter().map(|a| a.doctor_id).collect();
        ids.sort();
        ids.dedup();

        let lookups = ids.iter().map(|id| self.doctors.get_doctor(*id));
        ids.iter()
            .zip(join_all(lookups).await)
            .map(|(id, found)| {
                let name = found.map(|d| d.full_name()).unwrap_or_else(|_| id.to_string());
                (*id, name)
            })
            .collect()
    }
}

fn render_csv(appointments: &[Appointment], doctor_names: &HashMap<Uuid, String>, patient_name: &str) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for appointment in appointments {
        let doctor = doctor_names
            .get(&appointment.doctor_id)
            .cloned()
            .unwrap_or_else(|| appointment.doctor_id.to_string());
        let row = [
            appointment.id.to_string(),
            doctor,
            patient_name.to_string(),
            to_wire(&appointment.start_time),
            to_wire(&appointment.end_time),
            appointment.reason.clone().unwrap_or_default(),
            appointment.status.as_str().to_string(),
        ];
        let fields: Vec<Cow<'_, str>> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
