//! `get_workflow_guidance`: scripted next-step hints for the conversation

use super::{decode_arguments, Tool, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// (step, guidance) in conversation order
const STEPS: &[(&str, &str)] = &[
    (
        "greeting",
        "ทักทายลูกค้าอย่างสุภาพ แนะนำตัวว่าเป็นผู้ช่วยของ NCS และถามว่าต้องการใช้บริการทำความสะอาดอะไร",
    ),
    (
        "identify_service",
        "ระบุประเภทบริการ (ซักขจัดคราบ หรือ กำจัดเชื้อโรค-ไรฝุ่น) และประเภทสินค้า เช่น ที่นอน โซฟา ม่าน พรม",
    ),
    (
        "collect_details",
        "สอบถามขนาด จำนวน และประเภทลูกค้า (ทั่วไป หรือ สมาชิก) ให้ครบก่อนเสนอราคา",
    ),
    (
        "quote_price",
        "เรียก get_ncs_pricing ด้วยข้อมูลที่ได้ แล้วสรุปราคาให้ลูกค้าอย่างชัดเจน",
    ),
    (
        "check_availability",
        "ถามเดือนที่ลูกค้าสะดวก แล้วเรียก get_available_slots_with_months เพื่อแจ้งวันว่าง",
    ),
    (
        "confirm_booking",
        "ทวนรายละเอียด บริการ ราคา วันเวลา และที่อยู่ แล้วขอชื่อกับเบอร์โทรเพื่อยืนยันการจอง",
    ),
    (
        "follow_up",
        "ขอบคุณลูกค้า แจ้งว่าเจ้าหน้าที่จะติดต่อกลับเพื่อยืนยัน และถามว่ามีอะไรให้ช่วยเพิ่มเติมหรือไม่",
    ),
];

#[derive(Debug, Deserialize)]
struct WorkflowArgs {
    #[serde(default)]
    current_step: String,
    #[serde(default)]
    context: Option<String>,
}

pub struct WorkflowGuidanceTool;

impl WorkflowGuidanceTool {
    fn guidance(step: &str) -> Option<&'static str> {
        STEPS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(step))
            .map(|(_, text)| *text)
    }

    fn known_steps() -> String {
        STEPS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Tool for WorkflowGuidanceTool {
    fn name(&self) -> &'static str {
        "get_workflow_guidance"
    }

    fn description(&self) -> &'static str {
        "Guidance for the current step of the booking conversation."
    }

    fn parameters(&self) -> Value {
        let steps: Vec<&str> = STEPS.iter().map(|(name, _)| *name).collect();
        json!({
            "type": "object",
            "required": ["current_step"],
            "properties": {
                "current_step": {"type": "string", "enum": steps},
                "context": {"type": "string", "description": "Anything the customer already said"}
            }
        })
    }

    async fn run(&self, arguments: &Value) -> ToolOutput {
        let args: WorkflowArgs = match decode_arguments(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutput::error(e.to_string()),
        };
        let step = args.current_step.trim();

        let Some(guidance) = Self::guidance(step) else {
            return ToolOutput::error(format!(
                "ไม่รู้จักขั้นตอน '{step}' ขั้นตอนที่มี: {}",
                Self::known_steps()
            ));
        };

        let mut text = format!("ขั้นตอน {step}: {guidance}");
        if let Some(context) = args.context.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            text.push_str("\nข้อมูลจากลูกค้า: ");
            text.push_str(context);
        }
        ToolOutput::success(text)
    }
}
