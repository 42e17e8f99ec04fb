//! Permission code constants for the bundled school catalog.
//!
//! Use these instead of string literals at call sites so a rename is a
//! compile error rather than a silent deny.
//!
//! # Example
//!
//! ```ignore
//! use scholaris_auth::codes;
//!
//! if session.can_do(codes::FEE_COLLECT) {
//!     // render the "Collect fee" button
//! }
//! ```

// =============================================================================
// Students
// =============================================================================

pub const STUDENT_CREATE: &str = "student.create";
pub const STUDENT_READ: &str = "student.read";
pub const STUDENT_UPDATE: &str = "student.update";
pub const STUDENT_DELETE: &str = "student.delete";
pub const STUDENT_EXPORT: &str = "student.export";
pub const STUDENT_PROMOTE: &str = "student.promote";

// =============================================================================
// Teachers / staff
// =============================================================================

pub const TEACHER_CREATE: &str = "teacher.create";
pub const TEACHER_READ: &str = "teacher.read";
pub const TEACHER_UPDATE: &str = "teacher.update";
pub const TEACHER_DELETE: &str = "teacher.delete";

// =============================================================================
// Classes and sections
// =============================================================================

pub const CLASS_CREATE: &str = "class.create";
pub const CLASS_READ: &str = "class.read";
pub const CLASS_UPDATE: &str = "class.update";
pub const CLASS_DELETE: &str = "class.delete";

// =============================================================================
// Attendance
// =============================================================================

pub const ATTENDANCE_READ: &str = "attendance.read";
pub const ATTENDANCE_MARK: &str = "attendance.mark";
pub const ATTENDANCE_UPDATE: &str = "attendance.update";
pub const ATTENDANCE_EXPORT: &str = "attendance.export";

// =============================================================================
// Exams and results
// =============================================================================

pub const EXAM_CREATE: &str = "exam.create";
pub const EXAM_READ: &str = "exam.read";
pub const EXAM_UPDATE: &str = "exam.update";
pub const EXAM_DELETE: &str = "exam.delete";
pub const EXAM_PUBLISH: &str = "exam.publish";

// =============================================================================
// Fees
// =============================================================================

pub const FEE_CREATE: &str = "fee.create";
pub const FEE_READ: &str = "fee.read";
pub const FEE_UPDATE: &str = "fee.update";
pub const FEE_DELETE: &str = "fee.delete";
pub const FEE_COLLECT: &str = "fee.collect";
pub const FEE_REFUND: &str = "fee.refund";
pub const FEE_EXPORT: &str = "fee.export";

// =============================================================================
// Branches
// =============================================================================

pub const BRANCH_CREATE: &str = "branch.create";
/// Reading the branch directory; also the capability required to switch the
/// active branch scope.
pub const BRANCH_READ: &str = "branch.read";
pub const BRANCH_UPDATE: &str = "branch.update";
pub const BRANCH_DELETE: &str = "branch.delete";

// =============================================================================
// Roles
// =============================================================================

pub const ROLE_CREATE: &str = "role.create";
pub const ROLE_READ: &str = "role.read";
pub const ROLE_UPDATE: &str = "role.update";
pub const ROLE_DELETE: &str = "role.delete";
pub const ROLE_ASSIGN: &str = "role.assign";

// =============================================================================
// Reports
// =============================================================================

pub const REPORT_VIEW: &str = "report.view";
pub const REPORT_EXPORT: &str = "report.export";

// =============================================================================
// Settings
// =============================================================================

pub const SETTING_READ: &str = "setting.read";
pub const SETTING_UPDATE: &str = "setting.update";

/// Declaration order of the bundled catalog: `(module, codes)`.
pub(crate) const STANDARD_MODULES: &[(&str, &[&str])] = &[
    (
        "student",
        &[STUDENT_CREATE, STUDENT_READ, STUDENT_UPDATE, STUDENT_DELETE, STUDENT_EXPORT, STUDENT_PROMOTE],
    ),
    ("teacher", &[TEACHER_CREATE, TEACHER_READ, TEACHER_UPDATE, TEACHER_DELETE]),
    ("class", &[CLASS_CREATE, CLASS_READ, CLASS_UPDATE, CLASS_DELETE]),
    (
        "attendance",
        &[ATTENDANCE_READ, ATTENDANCE_MARK, ATTENDANCE_UPDATE, ATTENDANCE_EXPORT],
    ),
    ("exam", &[EXAM_CREATE, EXAM_READ, EXAM_UPDATE, EXAM_DELETE, EXAM_PUBLISH]),
    (
        "fee",
        &[FEE_CREATE, FEE_READ, FEE_UPDATE, FEE_DELETE, FEE_COLLECT, FEE_REFUND, FEE_EXPORT],
    ),
    ("branch", &[BRANCH_CREATE, BRANCH_READ, BRANCH_UPDATE, BRANCH_DELETE]),
    ("role", &[ROLE_CREATE, ROLE_READ, ROLE_UPDATE, ROLE_DELETE, ROLE_ASSIGN]),
    ("report", &[REPORT_VIEW, REPORT_EXPORT]),
    ("setting", &[SETTING_READ, SETTING_UPDATE]),
];

/// Modules a branch administrator does not manage (school-wide concerns).
pub(crate) const SCHOOL_ONLY_MODULES: &[&str] = &["branch", "role", "setting"];
