//! Teaching assignments: which teacher covers which class, and which
//! subjects they teach in it.

use sqlx::PgPool;

use crate::db::models::{ClassGroup, Subject, TeacherClass, TeacherClassSubject};

pub(crate) async fn link_teacher_class(
    pool: &PgPool,
    id: &str,
    teacher_id: &str,
    class_group_id: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<TeacherClass, sqlx::Error> {
    sqlx::query_as::<_, TeacherClass>(
        "INSERT INTO teacher_classes (id, teacher_id, class_group_id, created_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (teacher_id, class_group_id) DO UPDATE SET teacher_id = EXCLUDED.teacher_id
         RETURNING id, teacher_id, class_group_id, created_at",
    )
    .bind(id)
    .bind(teacher_id)
    .bind(class_group_id)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn link_class_subject(
    pool: &PgPool,
    id: &str,
    teacher_class_id: &str,
    subject_id: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<TeacherClassSubject, sqlx::Error> {
    sqlx::query_as::<_, TeacherClassSubject>(
        "INSERT INTO teacher_class_subjects (id, teacher_class_id, subject_id, created_at)
         VALUES ($1,$2,$3,$4)
         ON CONFLICT (teacher_class_id, subject_id) DO UPDATE SET subject_id = EXCLUDED.subject_id
         RETURNING id, teacher_class_id, subject_id, created_at",
    )
    .bind(id)
    .bind(teacher_class_id)
    .bind(subject_id)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_teacher_class(
    pool: &PgPool,
    teacher_id: &str,
    class_group_id: &str,
) -> Result<Option<TeacherClass>, sqlx::Error> {
    sqlx::query_as::<_, TeacherClass>(
        "SELECT id, teacher_id, class_group_id, created_at
         FROM teacher_classes
         WHERE teacher_id = $1 AND class_group_id = $2",
    )
    .bind(teacher_id)
    .bind(class_group_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn classes_for_teacher(
    pool: &PgPool,
    teacher_id: &str,
) -> Result<Vec<ClassGroup>, sqlx::Error> {
    sqlx::query_as::<_, ClassGroup>(
        "SELECT cg.id, cg.school_id, cg.display_name, cg.school_year, cg.shift, cg.created_at
         FROM class_groups cg
         JOIN teacher_classes tc ON tc.class_group_id = cg.id
         WHERE tc.teacher_id = $1
         ORDER BY cg.school_year, cg.display_name",
    )
    .bind(teacher_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn subjects_for_teacher_class(
    pool: &PgPool,
    teacher_id: &str,
    class_group_id: &str,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT s.id, s.school_id, s.name, s.created_at
         FROM subjects s
         JOIN teacher_class_subjects tcs ON tcs.subject_id = s.id
         JOIN teacher_classes tc ON tc.id = tcs.teacher_class_id
         WHERE tc.teacher_id = $1 AND tc.class_group_id = $2
         ORDER BY s.name",
    )
    .bind(teacher_id)
    .bind(class_group_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn teacher_covers_class_subject(
    pool: &PgPool,
    teacher_id: &str,
    class_group_id: &str,
    subject_id: &str,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM teacher_class_subjects tcs
         JOIN teacher_classes tc ON tc.id = tcs.teacher_class_id
         WHERE tc.teacher_id = $1 AND tc.class_group_id = $2 AND tcs.subject_id = $3",
    )
    .bind(teacher_id)
    .bind(class_group_id)
    .bind(subject_id)
    .fetch_one(pool)
    .await?;

    Ok(found > 0)
}
