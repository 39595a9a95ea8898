use crate::model::Grade;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Competency {
    pub code: &'static str,
    pub text: &'static str,
}

const fn c(code: &'static str, text: &'static str) -> Competency {
    Competency { code, text }
}

/// Intermediate level 1, grades 6 and 7.
pub static COMPETENCIES_TC1: &[Competency] = &[
    c("1.1.TC1a", "Xác định được nhu cầu thông tin, tìm kiếm dữ liệu trong môi trường số bằng các từ khoá đơn giản"),
    c("1.1.TC1b", "Truy cập và điều hướng giữa các nguồn dữ liệu, thông tin và nội dung số quen thuộc"),
    c("1.2.TC1a", "So sánh độ tin cậy của các nguồn dữ liệu, thông tin và nội dung số thường gặp"),
    c("1.3.TC1a", "Tổ chức, lưu trữ và truy xuất dữ liệu, thông tin trong thư mục và tệp một cách có hệ thống"),
    c("2.1.TC1a", "Lựa chọn công nghệ số phù hợp để tương tác với bạn bè, thầy cô"),
    c("2.2.TC1a", "Chia sẻ dữ liệu, thông tin và nội dung số qua các công cụ số thông dụng"),
    c("2.3.TC1a", "Tìm kiếm cơ hội tham gia hoạt động cộng đồng thông qua dịch vụ số công cộng"),
    c("2.4.TC1a", "Sử dụng công cụ số để cùng hợp tác thực hiện nhiệm vụ học tập theo nhóm"),
    c("2.5.TC1a", "Nhận biết và tuân thủ các quy tắc ứng xử cơ bản khi giao tiếp trên môi trường số"),
    c("2.6.TC1a", "Nhận biết danh tính số của bản thân và các dấu vết để lại khi hoạt động trên mạng"),
    c("3.1.TC1a", "Tạo và chỉnh sửa nội dung số đơn giản ở dạng văn bản, hình ảnh, sơ đồ"),
    c("3.2.TC1a", "Chỉnh sửa, kết hợp các nội dung số có sẵn để tạo sản phẩm mới đơn giản"),
    c("3.3.TC1a", "Nhận biết quy định về bản quyền và giấy phép khi sử dụng nội dung số"),
    c("3.4.TC1a", "Liệt kê các chỉ dẫn đơn giản để hệ thống máy tính giải quyết một vấn đề cụ thể"),
    c("4.1.TC1a", "Nhận biết các rủi ro, mối đe doạ trong môi trường số và cách bảo vệ thiết bị"),
    c("4.2.TC1a", "Bảo vệ dữ liệu cá nhân và quyền riêng tư bằng các biện pháp đơn giản"),
    c("4.3.TC1a", "Nhận biết tác hại của việc sử dụng công nghệ số quá mức đối với sức khoẻ"),
    c("4.4.TC1a", "Nhận biết tác động của công nghệ số đến môi trường"),
    c("5.1.TC1a", "Xác định các vấn đề kĩ thuật đơn giản khi vận hành thiết bị và tìm cách khắc phục"),
    c("5.2.TC1a", "Lựa chọn công cụ số phù hợp với nhu cầu học tập của bản thân"),
    c("5.3.TC1a", "Sử dụng công nghệ số để tạo ra sản phẩm học tập mang tính sáng tạo"),
    c("5.4.TC1a", "Nhận biết những hạn chế về năng lực số của bản thân cần cải thiện"),
    c("6.1.TC1a", "Nhận biết một số ứng dụng trí tuệ nhân tạo quen thuộc trong đời sống"),
    c("6.2.TC1a", "Sử dụng công cụ trí tuệ nhân tạo đơn giản có hướng dẫn để hỗ trợ học tập"),
];

/// Intermediate level 2, grades 8 and 9.
pub static COMPETENCIES_TC2: &[Competency] = &[
    c("1.1.TC2a", "Tìm kiếm dữ liệu, thông tin trong môi trường số bằng chiến lược tìm kiếm phù hợp"),
    c("1.1.TC2b", "Điều chỉnh chiến lược tìm kiếm để lọc thông tin theo nhu cầu"),
    c("1.2.TC2a", "Phân tích, đánh giá độ tin cậy của nguồn dữ liệu, thông tin và nội dung số"),
    c("1.3.TC2a", "Quản lý dữ liệu, thông tin trong môi trường có cấu trúc như bảng tính, cơ sở dữ liệu"),
    c("2.1.TC2a", "Sử dụng linh hoạt các công nghệ số để tương tác phù hợp với bối cảnh"),
    c("2.2.TC2a", "Chia sẻ nội dung số kèm ghi nguồn và kiểm soát quyền truy cập"),
    c("2.3.TC2a", "Tham gia các hoạt động xã hội thông qua dịch vụ số công và tư nhân"),
    c("2.4.TC2a", "Sử dụng công cụ số để cùng xây dựng và quản lý sản phẩm chung của nhóm"),
    c("2.5.TC2a", "Điều chỉnh cách giao tiếp phù hợp với đối tượng và văn hoá trong môi trường số"),
    c("2.6.TC2a", "Quản lý danh tính số và bảo vệ uy tín của bản thân trên mạng"),
    c("3.1.TC2a", "Tạo nội dung số đa phương tiện để trình bày ý tưởng của bản thân"),
    c("3.2.TC2a", "Tích hợp, tái tạo nội dung số có sẵn để tạo sản phẩm mới có giá trị"),
    c("3.3.TC2a", "Áp dụng đúng quy định về bản quyền và giấy phép khi tái sử dụng nội dung số"),
    c("3.4.TC2a", "Viết chương trình có cấu trúc rẽ nhánh, lặp để giải quyết bài toán cụ thể"),
    c("4.1.TC2a", "Áp dụng các biện pháp bảo vệ thiết bị và nội dung số trước phần mềm độc hại"),
    c("4.2.TC2a", "Thiết lập các tuỳ chọn bảo mật để bảo vệ dữ liệu cá nhân"),
    c("4.3.TC2a", "Phòng tránh nguy cơ bắt nạt trực tuyến và ảnh hưởng tiêu cực đến sức khoẻ tinh thần"),
    c("4.4.TC2a", "Sử dụng thiết bị số tiết kiệm năng lượng, xử lý rác thải điện tử đúng cách"),
    c("5.1.TC2a", "Phân tích và giải quyết các sự cố kĩ thuật thường gặp khi sử dụng thiết bị số"),
    c("5.2.TC2a", "Đánh giá và lựa chọn giải pháp công nghệ phù hợp để giải quyết nhiệm vụ"),
    c("5.3.TC2a", "Vận dụng tư duy máy tính để giải quyết vấn đề thực tiễn"),
    c("5.4.TC2a", "Tự xác định và lập kế hoạch phát triển năng lực số của bản thân"),
    c("6.1.TC2a", "Giải thích nguyên lý hoạt động cơ bản của một số hệ thống trí tuệ nhân tạo"),
    c("6.2.TC2a", "Sử dụng công cụ trí tuệ nhân tạo có trách nhiệm để hỗ trợ học tập"),
    c("6.3.TC2a", "Đánh giá kết quả do trí tuệ nhân tạo tạo ra và nhận biết sai lệch"),
];

/// Registry in force for a grade: TC1 for grades 6–7, TC2 for 8–9.
pub fn for_grade(grade: Grade) -> &'static [Competency] {
    match grade {
        Grade::Six | Grade::Seven => COMPETENCIES_TC1,
        Grade::Eight | Grade::Nine => COMPETENCIES_TC2,
    }
}

pub fn band_name(grade: Grade) -> &'static str {
    match grade {
        Grade::Six | Grade::Seven => "TC1",
        Grade::Eight | Grade::Nine => "TC2",
    }
}

pub fn lookup(grade: Grade, code: &str) -> Option<&'static Competency> {
    for_grade(grade).iter().find(|c| c.code == code)
}
