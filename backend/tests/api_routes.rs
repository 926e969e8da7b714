use actix_web::{http::StatusCode, test, web, App};
use placement_backend::{configure, AppState};
use placement_core::accounts::create_account;
use placement_core::companies::create_company;
use placement_core::{CompanyInput, NewAccount, NumberInput, ProfileUpdate, Role, SkillList, Store};
use serde_json::{json, Value};
use std::sync::Arc;

macro_rules! app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::new(AppState::new($store.clone()))))
                .configure(configure),
        )
        .await
    };
}

struct Fixture {
    store: Store,
    admin: String,
    mentor: String,
    student: String,
}

fn fixture() -> Fixture {
    let store = Store::in_memory().unwrap();
    let admin = create_account(&store, NewAccount::new("Admin", "admin@test.com", Role::Admin))
        .unwrap()
        .id;
    let mentor = create_account(&store, NewAccount::new("Mentor", "mentor@test.com", Role::Mentor))
        .unwrap()
        .id;
    let student = create_account(
        &store,
        NewAccount::new("Student", "student@test.com", Role::Student).with_profile(ProfileUpdate {
            cgpa: Some(NumberInput::Number(8.5)),
            skills: Some(SkillList::from(vec!["React", "Node.js"])),
            ..Default::default()
        }),
    )
    .unwrap()
    .id;
    create_company(
        &store,
        CompanyInput {
            name: "Tech Corp".to_string(),
            ctc: NumberInput::Number(12.0),
            location: "Bangalore".to_string(),
            min_cgpa: NumberInput::Number(7.0),
            required_skills: Some(SkillList::from(vec!["react"])),
            is_active: Some(true),
            description: None,
        },
    )
    .unwrap();

    Fixture {
        store,
        admin,
        mentor,
        student,
    }
}

#[actix_rt::test]
async fn test_health_needs_no_caller() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_missing_or_unknown_caller_is_unauthorized() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::get().uri("/api/roster").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthorized");

    let req = test::TestRequest::get()
        .uri("/api/roster")
        .insert_header(("X-User-Id", "nobody"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_wrong_role_is_forbidden() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::post()
        .uri("/api/assign")
        .insert_header(("X-User-Id", f.student.as_str()))
        .set_json(json!({ "studentId": f.student, "mentorId": f.mentor }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/eligible")
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn test_assign_then_roster_eligible_and_analytics() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::post()
        .uri("/api/assign")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(json!({ "studentId": f.student, "mentorId": f.mentor }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"], "assigned");

    let req = test::TestRequest::get()
        .uri("/api/roster")
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let roster = body["data"].as_array().unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0]["id"], f.student.as_str());
    assert_eq!(roster[0]["progress"]["problemsSolved"], 0);

    let req = test::TestRequest::get()
        .uri("/api/eligible")
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let eligible = body["data"].as_array().unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0]["name"], "Tech Corp");
    assert_eq!(eligible[0]["minCGPA"], 7.0);

    let req = test::TestRequest::get()
        .uri("/api/analytics/mentor")
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["totalStudents"], 1);
    assert_eq!(body["data"]["avgCGPA"], 8.5);
    assert_eq!(body["data"]["skillsDistribution"]["React"], 1);

    let req = test::TestRequest::get()
        .uri("/api/users/profile")
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["profile"]["assignedMentor"], f.mentor.as_str());
    assert_eq!(body["data"]["mentor"]["email"], "mentor@test.com");
}

#[actix_rt::test]
async fn test_assign_error_statuses() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::post()
        .uri("/api/assign")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(json!({ "studentId": "missing", "mentorId": f.mentor }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/assign")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(json!({ "studentId": f.mentor, "mentorId": f.student }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "invalid_role");

    let req = test::TestRequest::post()
        .uri("/api/assign")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "bad_request");
}

#[actix_rt::test]
async fn test_duplicate_progress_is_conflict() {
    let f = fixture();
    let app = app!(f.store);

    let create = || {
        test::TestRequest::post()
            .uri("/api/progress")
            .insert_header(("X-User-Id", f.student.as_str()))
            .set_json(json!({ "problemsSolved": 5 }))
            .to_request()
    };

    let resp = test::call_service(&app, create()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, create()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "conflict");
}

#[actix_rt::test]
async fn test_feedback_round_trip() {
    let f = fixture();
    let app = app!(f.store);
    placement_core::assignment::assign(&f.store, &f.student, &f.mentor).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/feedback")
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .set_json(json!({
            "studentId": f.student,
            "message": "Work on graphs",
            "category": "technical"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/feedback/student")
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["mentor"]["name"], "Mentor");
    assert_eq!(entries[0]["category"], "technical");
}

#[actix_rt::test]
async fn test_admin_analytics_reports_company_counts() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::get()
        .uri("/api/analytics/admin")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["data"],
        json!({
            "totalStudents": 1,
            "totalMentors": 1,
            "totalCompanies": 1,
            "activeCompanies": 1
        })
    );
}

#[actix_rt::test]
async fn test_dashboard_form_strings_are_accepted() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::post()
        .uri("/api/companies")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(json!({
            "name": "Data Labs",
            "ctc": "12",
            "location": "Hyderabad",
            "minCGPA": "7",
            "requiredSkills": "Python, SQL",
            "description": ""
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["ctc"], 12.0);
    assert_eq!(body["data"]["minCGPA"], 7.0);
    assert_eq!(body["data"]["requiredSkills"], json!(["Python", "SQL"]));

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(("X-User-Id", f.student.as_str()))
        .set_json(json!({ "cgpa": "8.5", "projects": "3", "skills": "Python, SQL" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["profile"]["cgpa"], 8.5);
    assert_eq!(body["data"]["profile"]["projects"], 3);

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(("X-User-Id", f.student.as_str()))
        .set_json(json!({ "cgpa": "eight" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
}

#[actix_rt::test]
async fn test_unassign_route() {
    let f = fixture();
    let app = app!(f.store);
    placement_core::assignment::assign(&f.store, &f.student, &f.mentor).unwrap();

    let unassign = |caller: &str, student: &str| {
        test::TestRequest::delete()
            .uri(&format!("/api/assign/{}", student))
            .insert_header(("X-User-Id", caller.to_string()))
            .to_request()
    };

    let resp = test::call_service(&app, unassign(&f.mentor, &f.student)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::call_and_read_body_json(&app, unassign(&f.admin, &f.student)).await;
    assert_eq!(body["data"]["message"], "Student unassigned");
    let roster = placement_core::assignment::roster(&f.store, &f.mentor).unwrap();
    assert!(roster.is_empty());

    let resp = test::call_service(&app, unassign(&f.admin, &f.mentor)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(&app, unassign(&f.admin, "missing")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_company_crud_routes() {
    let f = fixture();
    let app = app!(f.store);

    let company = json!({
        "name": "Cloud Nine",
        "ctc": 18,
        "location": "Chennai",
        "minCGPA": 8,
        "requiredSkills": ["Go"]
    });

    let req = test::TestRequest::post()
        .uri("/api/companies")
        .insert_header(("X-User-Id", f.student.as_str()))
        .set_json(company.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/companies")
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(company)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["isActive"], true);

    let req = test::TestRequest::put()
        .uri(&format!("/api/companies/{}", id))
        .insert_header(("X-User-Id", f.admin.as_str()))
        .set_json(json!({
            "name": "Cloud Nine",
            "ctc": 20,
            "location": "Chennai",
            "minCGPA": 8.5,
            "requiredSkills": ["Go"],
            "isActive": false
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["ctc"], 20.0);
    assert_eq!(body["data"]["isActive"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/companies/{}", id))
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["minCGPA"], 8.5);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/companies/{}", id))
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/companies/{}", id))
        .insert_header(("X-User-Id", f.admin.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/companies/{}", id))
        .insert_header(("X-User-Id", f.admin.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/companies")
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_profile_update_is_student_only() {
    let f = fixture();
    let app = app!(f.store);

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(("X-User-Id", f.mentor.as_str()))
        .set_json(json!({ "cgpa": 9.0 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri("/api/users/profile")
        .insert_header(("X-User-Id", f.student.as_str()))
        .set_json(json!({ "branch": "Electronics" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["profile"]["branch"], "Electronics");
    assert_eq!(body["data"]["profile"]["cgpa"], 8.5);
    assert_eq!(body["data"]["profile"]["skills"], json!(["React", "Node.js"]));
}

#[actix_rt::test]
async fn test_certification_routes() {
    let f = fixture();
    let app = app!(f.store);

    let add = |caller: &str, name: &str| {
        test::TestRequest::post()
            .uri("/api/progress/certifications")
            .insert_header(("X-User-Id", caller.to_string()))
            .set_json(json!({
                "name": name,
                "issuer": "Cloud Academy",
                "dateObtained": "2024-03-01"
            }))
            .to_request()
    };

    let resp = test::call_service(&app, add(&f.mentor, "AWS")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(&app, add(&f.student, "AWS")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::call_and_read_body_json(&app, add(&f.student, "GCP")).await;
    let certs = body["data"]["certifications"].as_array().unwrap();
    assert_eq!(certs.len(), 2);
    assert_eq!(certs[0]["dateObtained"], "2024-03-01");
    let aws = certs[0]["id"].as_str().unwrap().to_string();

    let delete = |caller: &str, cert: &str| {
        test::TestRequest::delete()
            .uri(&format!("/api/progress/certifications/{}", cert))
            .insert_header(("X-User-Id", caller.to_string()))
            .to_request()
    };

    let resp = test::call_service(&app, delete(&f.admin, &aws)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::call_and_read_body_json(&app, delete(&f.student, &aws)).await;
    let certs = body["data"]["certifications"].as_array().unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0]["name"], "GCP");

    let resp = test::call_service(&app, delete(&f.student, &aws)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_corrupt_stored_row_is_server_error() {
    let f = fixture();
    let app = app!(f.store);
    f.store
        .with_conn(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA ignore_check_constraints = ON;
                 INSERT INTO feedback (id, mentor_id, student_id, message, category, created_at)
                 VALUES ('f1', '{}', '{}', 'Nice work', 'praise', '2024-03-01T10:00:00Z');",
                f.mentor, f.student
            ))?;
            Ok(())
        })
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/feedback/student")
        .insert_header(("X-User-Id", f.student.as_str()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "storage_error");
    assert_eq!(body["error"], "internal server error");
}
