use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Optional predicate set for admin record queries. Unset fields impose no
/// filter and are never serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub company: Option<String>,
    pub student: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_student(mut self, student: impl Into<String>) -> Self {
        self.student = Some(student.into());
        self
    }

    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Query pairs for the admin endpoints. Blank strings count as unset:
    /// the serialized query never contains a bare `key=`.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_text(&mut pairs, "company", &self.company);
        push_text(&mut pairs, "student", &self.student);
        if let Some(start) = self.start {
            pairs.push(("start", start.format(DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("end", end.format(DATE_FORMAT).to_string()));
        }
        pairs
    }
}

fn push_text(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(value) = value {
        let value = value.trim();
        if !value.is_empty() {
            pairs.push((key, value.to_string()));
        }
    }
}

/// Server-side pagination knobs, serialized the same way as the criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Paging {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Paging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
