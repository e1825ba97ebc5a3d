//! 课程页面抽象。
//!
//! 页面是唯一的事实来源：课时列表、当前选中的课时、切换动作，
//! 以及当前课时的下载入口或可截取区域都从这里读取。

pub mod manifest;

use crate::download::error::HarvestError;
use crate::download::models::{CurrentItem, ItemRef};

pub trait CoursePage {
    fn course_name(&self) -> String;

    /// 展开所有折叠的章节，返回本次展开的数量。
    fn expand_all(&mut self) -> usize {
        0
    }

    /// 重新扫描页面，按页面顺序返回可见的课时。
    fn items(&self) -> Vec<ItemRef>;

    fn current_ordinal(&self) -> Option<usize>;

    /// 模拟点击，使 `ordinal` 成为当前课时。
    fn activate(&mut self, ordinal: usize) -> Result<(), HarvestError>;

    /// 切换后页面是否已呈现该课时的内容。
    fn is_ready(&self, ordinal: usize) -> bool {
        self.current_ordinal() == Some(ordinal)
    }

    /// 读取当前课时的元数据；页面没有选中项时返回 `None`。
    fn current_item(&self) -> Option<CurrentItem>;
}
