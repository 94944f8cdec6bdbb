use crate::models::{College, Course, Filters};

/// Check a college against the rating floor
#[inline]
pub fn matches_rating(college: &College, filters: &Filters) -> bool {
    college.rating >= filters.min_rating
}

/// Check a course against the fee cap.
///
/// A course with unknown fees is treated as sitting in the highest fee tier:
/// it passes only when the caller did not set a cap.
#[inline]
pub fn matches_fees(course: &Course, filters: &Filters) -> bool {
    match (filters.max_fees, course.fees) {
        (None, _) => true,
        (Some(cap), Some(fees)) => fees <= cap,
        (Some(_), None) => false,
    }
}

/// Check a course against the requested medium of instruction
#[inline]
pub fn matches_medium(course: &Course, filters: &Filters) -> bool {
    filters.medium.matches(course.medium.as_deref())
}

/// Fee, rating and medium constraints shared by every generator.
///
/// Distance is deliberately not part of this check; the geo stage and the
/// ranker enforce the radius so a fallback can widen it independently.
#[inline]
pub fn matches_filters(college: &College, course: &Course, filters: &Filters) -> bool {
    matches_rating(college, filters) && matches_fees(course, filters) && matches_medium(course, filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollegeType, Coordinate, Medium};
    use std::collections::BTreeSet;

    fn create_course(fees: Option<u64>, medium: Option<&str>) -> Course {
        Course {
            id: "cse".to_string(),
            name: "Computer Science".to_string(),
            description: String::new(),
            degree: "B.Tech".to_string(),
            fees,
            seats: 60,
            tags: BTreeSet::new(),
            medium: medium.map(str::to_string),
        }
    }

    fn create_college(rating: f64) -> College {
        College {
            id: "iit".to_string(),
            name: "Institute".to_string(),
            coordinate: Coordinate::new(28.5, 77.2),
            city: "Delhi".to_string(),
            state: "Delhi".to_string(),
            rating,
            college_type: CollegeType::Public,
            courses: vec![create_course(Some(100_000), Some("English"))],
        }
    }

    #[test]
    fn test_default_filters_accept_everything() {
        let filters = Filters::default();
        let college = create_college(0.0);
        let course = create_course(None, None);

        assert!(matches_filters(&college, &course, &filters));
    }

    #[test]
    fn test_fee_cap() {
        let filters = Filters { max_fees: Some(150_000), ..Filters::default() };

        assert!(matches_fees(&create_course(Some(150_000), None), &filters));
        assert!(!matches_fees(&create_course(Some(150_001), None), &filters));
        assert!(!matches_fees(&create_course(None, None), &filters));
    }

    #[test]
    fn test_rating_floor() {
        let filters = Filters { min_rating: 4.0, ..Filters::default() };

        assert!(matches_rating(&create_college(4.0), &filters));
        assert!(!matches_rating(&create_college(3.9), &filters));
    }

    #[test]
    fn test_medium_filter() {
        let filters = Filters { medium: Medium::Hindi, ..Filters::default() };

        assert!(matches_medium(&create_course(None, Some("Hindi")), &filters));
        assert!(!matches_medium(&create_course(None, Some("English")), &filters));
        assert!(!matches_medium(&create_course(None, None), &filters));
    }
}
