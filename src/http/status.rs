#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub code_num: u16,
    pub message: &'static str,
}

impl Status {
    pub const OK: Status = Status {
        code_num: 200,
        message: "OK",
    };
    pub const CREATED: Status = Status {
        code_num: 201,
        message: "Created",
    };
    pub const BAD_REQUEST: Status = Status {
        code_num: 400,
        message: "Bad Request",
    };
    pub const NOT_FOUND: Status = Status {
        code_num: 404,
        message: "Not Found",
    };
    pub const INTERNAL_SERVER_ERROR: Status = Status {
        code_num: 500,
        message: UNKNOWN,
    };
}

const UNKNOWN: &str = "Unknown";

impl From<u16> for Status {
    fn from(code_num: u16) -> Self {
        match code_num {
            200 => Status::OK,
            201 => Status::CREATED,
            400 => Status::BAD_REQUEST,
            404 => Status::NOT_FOUND,
            500 => Status::INTERNAL_SERVER_ERROR,
            _ => Status {
                code_num,
                message: UNKNOWN,
            },
        }
    }
}
