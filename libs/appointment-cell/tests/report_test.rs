mod common;

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::{AppointmentError, CancellationService, ReportJob, ReportService, ReportStatus};
use common::Clinic;
use shared_models::auth::Actor;
use shared_utils::test_utils::TestConfig;

async fn clinic_writing_to(dir: PathBuf) -> Clinic {
    let mut config = TestConfig::default().to_app_config();
    config.report_output_dir = dir;
    Clinic::with_config(config).await
}

async fn wait_for(service: &ReportService, job_id: Uuid) -> ReportJob {
    for _ in 0..100 {
        let job = service.job_status(job_id).await.unwrap();
        if job.status != ReportStatus::Pending {
            return job;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("report job {} never finished", job_id);
}

#[tokio::test]
async fn report_lists_every_appointment_of_the_patient() {
    let dir = tempfile::tempdir().unwrap();
    let clinic = clinic_writing_to(dir.path().to_path_buf()).await;

    let first = clinic.book(&clinic.slot_in(48).await).await;
    let second = clinic.book(&clinic.slot_in(72).await).await;
    CancellationService::new(&clinic.state)
        .cancel_appointment(second.id, &Actor::system())
        .await
        .unwrap();

    let service = ReportService::new(&clinic.state);
    let queued = service.request_patient_report(clinic.patient.id).await.unwrap();
    assert_eq!(queued.status, ReportStatus::Pending);
    assert!(queued.file_path.is_none());

    let job = wait_for(&service, queued.id).await;
    assert_eq!(job.status, ReportStatus::Completed);
    assert!(job.finished_at.is_some());

    let path = PathBuf::from(job.file_path.unwrap());
    assert!(path.starts_with(dir.path()));
    let csv = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines[0], "appointment_id,doctor,patient,start_time,end_time,reason,status");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with(&format!("{},Ana Lopez,Marta Ruiz,", first.id)));
    assert!(lines[1].ends_with(",Revision anual,CONFIRMED"));
    assert!(lines[2].ends_with(",CANCELLED"));
}

#[tokio::test]
async fn unwritable_directory_marks_the_job_failed() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-directory");
    std::fs::write(&blocker, "occupied").unwrap();
    let clinic = clinic_writing_to(blocker.join("reports")).await;

    let service = ReportService::new(&clinic.state);
    let queued = service.request_patient_report(clinic.patient.id).await.unwrap();

    let job = wait_for(&service, queued.id).await;
    assert_eq!(job.status, ReportStatus::Failed);
    assert!(job.error.is_some());
    assert!(job.file_path.is_none());
}

#[tokio::test]
async fn unknown_patient_or_job_is_not_found() {
    let clinic = Clinic::new().await;
    let service = ReportService::new(&clinic.state);

    assert_matches!(
        service.request_patient_report(Uuid::new_v4()).await,
        Err(AppointmentError::PatientNotFound)
    );
    assert_matches!(service.job_status(Uuid::new_v4()).await, Err(AppointmentError::ReportNotFound));
}
