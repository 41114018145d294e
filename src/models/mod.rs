pub mod period;
pub mod pfa;
pub mod planning;
pub mod skill;
pub mod subject;
pub mod user;
pub mod year;

pub use period::{NewPeriodRequest, Period, PeriodStatus, PeriodType, PeriodWithStatus, UpdatePeriodRequest};
pub use pfa::{
    Choice, Mode, NewChoiceRequest, NewTopicRequest, PfaTopic, TopicDetail, TopicStatus,
    UpdateChoiceRequest, UpdateTopicRequest,
};
pub use planning::{NewPlanningRequest, Planning, UpdatePlanningRequest};
pub use skill::{NewSkillRequest, Skill, SkillDetail, UpdateSkillRequest};
pub use subject::{
    Chapter, Curriculum, Evaluation, NewEvaluationRequest, NewPropositionRequest, NewSubjectRequest,
    ProgressEntry, ProgressReport, Proposition, Subject, SubjectRef, UpdateSubjectRequest,
};
pub use user::{
    NewStudentRequest, NewTeacherRequest, Student, Teacher, UpdateStudentRequest, UpdateTeacherRequest,
};
pub use year::{NewYearRequest, Year};
